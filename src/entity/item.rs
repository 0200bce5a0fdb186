// ============================================================================
// Item Instances
// ============================================================================

/// A concrete item handed to a quest event (traded, looted, clicked...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInstance {
    pub item_id: u32,
    pub name: String,
    pub quantity: i32,
    /// Remaining clicky charges, -1 for unlimited
    pub charges: i16,
}

impl ItemInstance {
    pub fn new(item_id: u32, name: &str, quantity: i32) -> Self {
        Self {
            item_id,
            name: name.to_string(),
            quantity,
            charges: -1,
        }
    }

    pub fn with_charges(mut self, charges: i16) -> Self {
        self.charges = charges;
        self
    }

    pub fn is_stack(&self) -> bool {
        self.quantity > 1
    }
}
