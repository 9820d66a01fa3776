use foundation::Extent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

pub trait Layer {
    fn id(&self) -> LayerId;

    /// Extent of the layer's data, if it has any.
    fn data_extent(&self) -> Option<Extent> {
        None
    }
}
