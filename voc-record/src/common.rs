//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, HW, TLBR};
pub use futures::stream::{self, StreamExt as _};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use label::{Label, ObjectLabel};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
pub use tfrecord::{Example, Feature};
pub use tracing::{debug, info, warn};

/// Bounding box in pixel units.
pub type PixelTLBR = TLBR<f64>;

/// Bounding box in ratio units of the image size.
pub type RatioTLBR = TLBR<f64>;

/// Image size in pixels.
pub type PixelSize = HW<usize>;
