use strum::{Display, EnumString};

/// Item rarity as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rarity {
    #[default]
    Normal,
    Magic,
    Rare,
    Unique,
}

/// What kind of pickup target a label represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetKind {
    Item,
    Container,
}

/// Attributes of a ground item that filters and the allocator look at.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDetails {
    pub name: String,
    pub base_name: String,
    /// Classification path, e.g. `Metadata/Items/Currency/CurrencyRerollRare`.
    pub path: String,
    pub class: String,
    pub rarity: Rarity,
    /// Footprint in inventory slots.
    pub width: u32,
    pub height: u32,
    pub stack_size: u32,
    pub max_stack_size: u32,
    pub item_level: u32,
    pub quality: u32,
    pub identified: bool,
    pub corrupted: bool,
}

impl ItemDetails {
    /// A 1×1 normal item with the given name and path; tests and demos build
    /// on this with struct update syntax.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            base_name: name.clone(),
            name,
            path: path.into(),
            class: String::new(),
            rarity: Rarity::Normal,
            width: 1,
            height: 1,
            stack_size: 1,
            max_stack_size: 1,
            item_level: 0,
            quality: 0,
            identified: true,
            corrupted: false,
        }
    }

    pub fn footprint(&self) -> ItemFootprint {
        ItemFootprint {
            type_key: self.path.clone(),
            width: self.width.max(1),
            height: self.height.max(1),
            stack_size: self.stack_size.max(1),
            max_stack_size: self.max_stack_size.max(1),
        }
    }
}

/// Attributes of a chest/strongbox style container.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerDetails {
    pub name: String,
    pub path: String,
    pub opened: bool,
}

/// Space an item needs in the inventory, in slot units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFootprint {
    /// Underlying item type; stacks only merge with the same key.
    pub type_key: String,
    pub width: u32,
    pub height: u32,
    pub stack_size: u32,
    pub max_stack_size: u32,
}

impl ItemFootprint {
    pub fn new(type_key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            type_key: type_key.into(),
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
}
