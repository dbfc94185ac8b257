//! Order line items
//!
//! An item is frozen into its order at creation: the menu name is a
//! snapshot, later menu edits do not flow back into existing orders.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// One line of a kitchen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    menu_item_id: String,
    name: String,
    quantity: u32,
    #[serde(default)]
    modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    special_instructions: Option<String>,
}

impl OrderItem {
    /// Create a validated item
    ///
    /// # Errors
    /// - `MissingField` if the menu reference or name is blank
    /// - `InvalidQuantity` if `quantity` is zero
    pub fn new(
        menu_item_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            menu_item_id: menu_item_id.into(),
            name: name.into(),
            quantity,
            modifiers: Vec::new(),
            special_instructions: None,
        };
        item.validate()?;
        Ok(item)
    }

    #[inline]
    #[must_use]
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.special_instructions = (!instructions.trim().is_empty()).then_some(instructions);
        self
    }

    /// Re-check invariants, for items that arrived through deserialization
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.menu_item_id.trim().is_empty() {
            return Err(ValidationError::MissingField("menuItemId"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.quantity < 1 {
            return Err(ValidationError::InvalidQuantity {
                item: self.name.clone(),
                quantity: self.quantity,
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn menu_item_id(&self) -> &str {
        &self.menu_item_id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    #[inline]
    #[must_use]
    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    #[inline]
    #[must_use]
    pub fn special_instructions(&self) -> Option<&str> {
        self.special_instructions.as_deref()
    }
}
