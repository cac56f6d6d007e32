use super::common::{EntityId, ScreenPoint, ScreenRect, WorldPosition};
use super::item::{ContainerDetails, ItemDetails, TargetKind};

/// Everything the host reports about the world for one tick.
///
/// Snapshots are immutable once built; the next tick brings a fresh one.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    /// Changes whenever the agent moves to a different area/instance.
    pub area_id: u64,
    /// Game window in screen pixels.
    pub window: ScreenRect,
    pub agent: AgentState,
    pub labels: Vec<GroundLabel>,
    pub interactives: Vec<InteractiveObject>,
}

impl WorldSnapshot {
    pub fn label(&self, id: EntityId) -> Option<&GroundLabel> {
        self.labels.iter().find(|label| label.id == id)
    }
}

/// The controlled agent.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentState {
    pub position: WorldPosition,
    pub is_alive: bool,
    pub is_moving: bool,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            position: WorldPosition::ORIGIN,
            is_alive: true,
            is_moving: false,
        }
    }
}

/// On-screen label state of a ground object.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelInfo {
    pub rect: ScreenRect,
    pub visible: bool,
    /// Stable index in the host's label list; labels without one cannot be
    /// addressed reliably.
    pub index: Option<u32>,
}

impl LabelInfo {
    /// True when a click on the label centre would land on this label.
    pub fn is_clickable(&self, usable: &ScreenRect) -> bool {
        self.visible && self.index.is_some() && !self.rect.is_empty() && usable.contains(self.center())
    }

    pub fn center(&self) -> ScreenPoint {
        self.rect.center()
    }
}

/// Item or container payload of a label.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetDetails {
    Item(ItemDetails),
    Container(ContainerDetails),
}

impl TargetDetails {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetDetails::Item(_) => TargetKind::Item,
            TargetDetails::Container(_) => TargetKind::Container,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TargetDetails::Item(item) => &item.name,
            TargetDetails::Container(container) => &container.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TargetDetails::Item(item) => &item.path,
            TargetDetails::Container(container) => &container.path,
        }
    }

    pub fn as_item(&self) -> Option<&ItemDetails> {
        match self {
            TargetDetails::Item(item) => Some(item),
            TargetDetails::Container(_) => None,
        }
    }
}

/// A labelled ground object as reported by the host.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroundLabel {
    pub id: EntityId,
    pub position: WorldPosition,
    /// Distance to the agent, precomputed by the host.
    pub distance: f32,
    pub label: LabelInfo,
    pub details: TargetDetails,
}

/// Kinds of interactive objects that compete for targeting focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractiveKind {
    Portal,
    Other,
}

/// A non-pickup object that can capture the shared aim/targeting cursor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractiveObject {
    pub id: EntityId,
    pub kind: InteractiveKind,
    pub position: WorldPosition,
    pub screen_rect: ScreenRect,
    /// Whether the object currently holds the targeting focus.
    pub is_targeted: bool,
}

/// Inventory contents as reported by the host.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventorySnapshot {
    pub rows: u32,
    pub cols: u32,
    pub items: Vec<InventoryItem>,
}

/// One placed inventory item; `row`/`col` is its top-left slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryItem {
    pub type_key: String,
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
    pub stack_size: u32,
    pub max_stack_size: u32,
}

impl InventoryItem {
    pub fn new(type_key: impl Into<String>, row: u32, col: u32, width: u32, height: u32) -> Self {
        Self {
            type_key: type_key.into(),
            row,
            col,
            width,
            height,
            stack_size: 1,
            max_stack_size: 1,
        }
    }

    pub fn with_stack(mut self, stack_size: u32, max_stack_size: u32) -> Self {
        self.stack_size = stack_size;
        self.max_stack_size = max_stack_size;
        self
    }

    pub fn spare_capacity(&self) -> u32 {
        self.max_stack_size.saturating_sub(self.stack_size)
    }
}
