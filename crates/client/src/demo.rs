//! Scripted host standing in for a live game connection.
//!
//! [`DemoHost`] implements every collaborator the runtime consumes: it serves
//! world and inventory snapshots and reacts to clicks by removing the clicked
//! label (picked up) or opening the clicked container. A small per-tick script
//! kills and resurrects the agent and moves it to a second area.
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use pickup_core::{
    AgentState, ContainerDetails, EntityId, GroundLabel, InventoryItem, InventoryOracle,
    InventorySnapshot, ItemDetails, LabelInfo, Rarity, ScreenPoint, ScreenRect, TargetDetails,
    WorldOracle, WorldPosition, WorldSnapshot,
};
use pickup_runtime::{BridgeError, BridgeResult, InMemoryRuleSource, InputBridge};

const SAMPLE_RULES: [(&str, &str); 2] = [
    (
        "currency",
        "// Currency of any kind\npath =~ \"Currency\"\n",
    ),
    (
        "valuables",
        "# Uniques, and unidentified high-level rares\nrarity == Unique\nrarity >= Rare && !identified && itemlevel >= 75\n",
    ),
];

/// Built-in rules used when no rule directory is configured.
pub fn sample_rules() -> InMemoryRuleSource {
    SAMPLE_RULES
        .iter()
        .fold(InMemoryRuleSource::new(), |source, (name, text)| {
            source.with_rule(*name, *text)
        })
}

/// Seeds an empty rule directory with the sample rules.
pub async fn write_sample_rules(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating rule directory {}", dir.display()))?;

    let mut entries = tokio::fs::read_dir(dir).await?;
    if entries.next_entry().await?.is_some() {
        return Ok(());
    }

    for (name, text) in SAMPLE_RULES {
        let path = dir.join(format!("{name}.{}", pickup_runtime::repository::RULE_EXTENSION));
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("writing sample rule {}", path.display()))?;
    }
    tracing::info!(dir = %dir.display(), "sample rules written");
    Ok(())
}

const WINDOW: ScreenRect = ScreenRect::new(0.0, 0.0, 1920.0, 1080.0);
const INVENTORY_COLS: u32 = 12;

struct DemoState {
    world: WorldSnapshot,
    inventory: Vec<InventoryItem>,
    next_id: u64,
}

impl DemoState {
    fn spawn_label(&mut self, distance: f32, details: TargetDetails) {
        let id = self.next_id;
        self.next_id += 1;
        let row = (id % 20) as f32;
        self.world.labels.push(GroundLabel {
            id: EntityId(id),
            position: WorldPosition::new(distance, 0.0, 0.0),
            distance,
            label: LabelInfo {
                rect: ScreenRect::new(700.0 + (id % 3) as f32 * 160.0, 200.0 + row * 32.0, 140.0, 24.0),
                visible: true,
                index: Some(id as u32),
            },
            details,
        });
    }

    fn populate_area(&mut self, area_id: u64) {
        self.world.area_id = area_id;
        self.world.labels.clear();

        self.spawn_label(
            40.0,
            TargetDetails::Item(ItemDetails::new("Rusted Sword", "Metadata/Items/Weapons/OneHandSwords/Rusted")),
        );
        self.spawn_label(
            120.0,
            TargetDetails::Item(ItemDetails {
                stack_size: 3,
                max_stack_size: 20,
                ..ItemDetails::new("Chaos Orb", "Metadata/Items/Currency/CurrencyRerollRare")
            }),
        );
        self.spawn_label(
            260.0,
            TargetDetails::Item(ItemDetails {
                rarity: Rarity::Rare,
                identified: false,
                item_level: 84,
                width: 2,
                height: 3,
                ..ItemDetails::new("Vaal Regalia", "Metadata/Items/Armours/BodyArmours/Regalia")
            }),
        );
        self.spawn_label(
            200.0,
            TargetDetails::Container(ContainerDetails {
                name: "Arcanist's Strongbox".into(),
                path: "Metadata/Chests/StrongBoxes/Arcanist".into(),
                opened: false,
            }),
        );
        self.spawn_label(
            750.0,
            TargetDetails::Item(ItemDetails::new("Divine Orb", "Metadata/Items/Currency/CurrencyModValues")),
        );
    }

    fn pick_up(&mut self, index: usize) {
        let label = self.world.labels.remove(index);
        match label.details {
            TargetDetails::Item(item) => {
                let slot = self.inventory.len() as u32;
                tracing::info!(name = %item.name, "demo: item picked up");
                self.inventory.push(
                    InventoryItem::new(
                        item.path,
                        slot / INVENTORY_COLS,
                        slot % INVENTORY_COLS,
                        1,
                        1,
                    )
                    .with_stack(item.stack_size, item.max_stack_size),
                );
            }
            TargetDetails::Container(container) => {
                tracing::info!(name = %container.name, "demo: container opened");
                let distance = label.distance;
                self.spawn_label(
                    distance,
                    TargetDetails::Item(ItemDetails {
                        rarity: Rarity::Unique,
                        ..ItemDetails::new("Headhunter", "Metadata/Items/Belts/Belt1")
                    }),
                );
            }
        }
    }
}

/// In-process world, inventory and input bridge.
pub struct DemoHost {
    state: Mutex<DemoState>,
}

impl DemoHost {
    pub fn new() -> Self {
        let mut state = DemoState {
            world: WorldSnapshot {
                area_id: 0,
                window: WINDOW,
                agent: AgentState::default(),
                labels: Vec::new(),
                interactives: Vec::new(),
            },
            inventory: Vec::new(),
            next_id: 1,
        };
        state.populate_area(1);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Applies the scripted world changes for `tick`.
    pub fn script(&self, tick: u64) {
        let mut state = self.state.lock();
        match tick {
            12 => {
                tracing::info!("demo: agent dies");
                state.world.agent.is_alive = false;
            }
            20 => {
                tracing::info!("demo: agent resurrected");
                state.world.agent.is_alive = true;
            }
            35 => {
                tracing::info!("demo: entering a new area");
                state.populate_area(2);
            }
            _ => {}
        }
    }
}

impl Default for DemoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldOracle for DemoHost {
    fn snapshot(&self) -> Option<WorldSnapshot> {
        Some(self.state.lock().world.clone())
    }
}

impl InventoryOracle for DemoHost {
    fn inventory(&self) -> Option<InventorySnapshot> {
        Some(InventorySnapshot {
            rows: 5,
            cols: INVENTORY_COLS,
            items: self.state.lock().inventory.clone(),
        })
    }
}

impl InputBridge for DemoHost {
    fn move_pointer(&self, _to: ScreenPoint) -> BridgeResult<()> {
        Ok(())
    }

    fn click(&self, at: ScreenPoint) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if !state.world.agent.is_alive {
            return Err(BridgeError::Rejected("agent is dead".into()));
        }
        if let Some(index) = state
            .world
            .labels
            .iter()
            .position(|label| label.label.visible && label.label.rect.contains(at))
        {
            state.pick_up(index);
        }
        Ok(())
    }

    fn target_action(&self, target: EntityId) -> BridgeResult<()> {
        let mut state = self.state.lock();
        match state.world.labels.iter().position(|label| label.id == target) {
            Some(index) => {
                state.pick_up(index);
                Ok(())
            }
            None => Err(BridgeError::Rejected(format!("no label for {target}"))),
        }
    }
}
