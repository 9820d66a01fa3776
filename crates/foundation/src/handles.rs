/// Generational handle: a slot index plus the generation it was issued in.
///
/// Two handles compare equal only when both parts match, so a handle kept
/// across a regeneration never aliases a newer object in the same slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32); // (index, generation)

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn generation(self) -> u32 {
        self.1
    }

    /// True when this handle was issued in `generation`.
    pub fn is_current(self, generation: u32) -> bool {
        self.1 == generation
    }
}
