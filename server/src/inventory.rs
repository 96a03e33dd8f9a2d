//! Player inventories and recipe availability
//!
//! Slot changes accumulate between ticks and are drained into the player's
//! next world update. The recipe list is only sent when it changes.

use shared::{ItemStack, SlotChange};

pub const SLOT_COUNT: usize = 8;
pub const MAX_STACK: u32 = 64;

pub struct Recipe {
    pub name: &'static str,
    pub inputs: &'static [(&'static str, u32)],
}

pub const RECIPES: &[Recipe] = &[
    Recipe {
        name: "plank",
        inputs: &[("wood", 1)],
    },
    Recipe {
        name: "torch",
        inputs: &[("wood", 1), ("coal", 1)],
    },
    Recipe {
        name: "wall",
        inputs: &[("stone", 3)],
    },
    Recipe {
        name: "furnace",
        inputs: &[("stone", 8), ("coal", 2)],
    },
];

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    slots: [Option<ItemStack>; SLOT_COUNT],
    changes: Vec<SlotChange>,
    known_recipes: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn count(&self, item: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    /// Adds items, topping up existing stacks first. Returns how many did not fit.
    pub fn add(&mut self, item: &str, mut count: u32) -> u32 {
        for index in 0..SLOT_COUNT {
            if count == 0 {
                break;
            }
            if let Some(stack) = self.slots[index].as_mut() {
                if stack.item == item && stack.count < MAX_STACK {
                    let moved = count.min(MAX_STACK - stack.count);
                    stack.count += moved;
                    count -= moved;
                    self.record(index);
                }
            }
        }

        for index in 0..SLOT_COUNT {
            if count == 0 {
                break;
            }
            if self.slots[index].is_none() {
                let moved = count.min(MAX_STACK);
                self.slots[index] = Some(ItemStack {
                    item: item.to_string(),
                    count: moved,
                });
                count -= moved;
                self.record(index);
            }
        }

        count
    }

    /// Removes up to `count` items. Returns how many were removed.
    pub fn remove(&mut self, item: &str, count: u32) -> u32 {
        let mut remaining = count;
        for index in (0..SLOT_COUNT).rev() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = self.slots[index].as_mut() else {
                continue;
            };
            if stack.item != item {
                continue;
            }
            let taken = remaining.min(stack.count);
            stack.count -= taken;
            remaining -= taken;
            if stack.count == 0 {
                self.slots[index] = None;
            }
            self.record(index);
        }
        count - remaining
    }

    fn record(&mut self, index: usize) {
        let stack = self.slots[index].clone();
        let slot = index as u8;
        match self.changes.iter_mut().find(|change| change.slot == slot) {
            Some(change) => change.stack = stack,
            None => self.changes.push(SlotChange { slot, stack }),
        }
    }

    /// Slot changes since the last call
    pub fn take_changes(&mut self) -> Vec<SlotChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn available_recipes(&self) -> Vec<String> {
        RECIPES
            .iter()
            .filter(|recipe| {
                recipe
                    .inputs
                    .iter()
                    .all(|(item, needed)| self.count(item) >= *needed)
            })
            .map(|recipe| recipe.name.to_string())
            .collect()
    }

    /// The recipe list if it differs from what was last reported
    pub fn take_recipe_update(&mut self) -> Option<Vec<String>> {
        let available = self.available_recipes();
        if available == self.known_recipes {
            return None;
        }
        self.known_recipes = available.clone();
        Some(available)
    }
}
