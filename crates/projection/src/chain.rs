//! The three-stage transform chain:
//!
//! ```text
//! pixel --System--> map coord --Warp--> warped --Operation--> reference
//! ```
//!
//! Forward runs the stages in order; inverse runs their inverses in reverse.

use std::fmt;
use std::rc::Rc;

use foundation::Vec2;

use crate::datum::DatumRoute;
use crate::error::ProjectionError;
use crate::tin::TinEngine;
use crate::world_file::WorldFile;

/// A coordinate transform in one direction.
pub type TransformFn = Rc<dyn Fn(Vec2) -> Result<Vec2, ProjectionError>>;

/// System↔Map stage.
#[derive(Debug, Clone)]
pub enum SystemStage {
    Identity,
    WorldFile(WorldFile),
}

/// Map↔Warp stage.
#[derive(Debug, Clone)]
pub enum WarpStage {
    Identity,
    /// Constant offset added on the way to the reference.
    Shift(Vec2),
    /// Image coordinates with Y down; the chain carries Y up.
    Tin(Rc<dyn TinEngine>),
}

/// Warp↔Operation stage.
#[derive(Debug, Clone)]
pub enum OperationStage {
    Identity,
    Datum(DatumRoute),
}

impl SystemStage {
    fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            SystemStage::Identity => Ok(p),
            SystemStage::WorldFile(wf) => Ok(wf.forward(p)),
        }
    }

    fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            SystemStage::Identity => Ok(p),
            SystemStage::WorldFile(wf) => Ok(wf.inverse(p)),
        }
    }
}

impl WarpStage {
    fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            WarpStage::Identity => Ok(p),
            WarpStage::Shift(d) => Ok(p + *d),
            WarpStage::Tin(tin) => Ok(tin.transform(p.flip_y(), false)?),
        }
    }

    fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            WarpStage::Identity => Ok(p),
            WarpStage::Shift(d) => Ok(p - *d),
            WarpStage::Tin(tin) => Ok(tin.transform(p, true)?.flip_y()),
        }
    }
}

impl OperationStage {
    fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            OperationStage::Identity => Ok(p),
            OperationStage::Datum(route) => route.forward(p),
        }
    }

    fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        match self {
            OperationStage::Identity => Ok(p),
            OperationStage::Datum(route) => route.inverse(p),
        }
    }
}

/// Immutable composition of the three stages.
#[derive(Debug, Clone)]
pub struct TransformChain {
    pub system: SystemStage,
    pub warp: WarpStage,
    pub operation: OperationStage,
}

impl Default for TransformChain {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformChain {
    pub fn new(system: SystemStage, warp: WarpStage, operation: OperationStage) -> Self {
        Self {
            system,
            warp,
            operation,
        }
    }

    pub fn identity() -> Self {
        Self::new(SystemStage::Identity, WarpStage::Identity, OperationStage::Identity)
    }

    pub fn shift(d: Vec2) -> Self {
        Self::new(SystemStage::Identity, WarpStage::Shift(d), OperationStage::Identity)
    }

    pub fn tin(tin: Rc<dyn TinEngine>) -> Self {
        Self::new(SystemStage::Identity, WarpStage::Tin(tin), OperationStage::Identity)
    }

    pub fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        let p = self.system.forward(p)?;
        let p = self.warp.forward(p)?;
        self.operation.forward(p)
    }

    pub fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        let p = self.operation.inverse(p)?;
        let p = self.warp.inverse(p)?;
        self.system.inverse(p)
    }

    /// Split into the forward/inverse closures the registry stores.
    pub fn into_pair(self) -> TransformPair {
        let chain = Rc::new(self);
        let inv = chain.clone();
        TransformPair {
            forward: Rc::new(move |p: Vec2| chain.forward(p)),
            inverse: Rc::new(move |p: Vec2| inv.inverse(p)),
        }
    }
}

/// Forward (to reference) and inverse (from reference) transforms.
#[derive(Clone)]
pub struct TransformPair {
    pub forward: TransformFn,
    pub inverse: TransformFn,
}

impl TransformPair {
    pub fn new(
        forward: impl Fn(Vec2) -> Result<Vec2, ProjectionError> + 'static,
        inverse: impl Fn(Vec2) -> Result<Vec2, ProjectionError> + 'static,
    ) -> Self {
        Self {
            forward: Rc::new(forward),
            inverse: Rc::new(inverse),
        }
    }
}

impl fmt::Debug for TransformPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPair").finish_non_exhaustive()
    }
}
