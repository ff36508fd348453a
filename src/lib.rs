pub mod clustering;
pub mod copac;
pub mod dense;
pub mod eigen;
pub mod error;
pub mod neighbors;
pub mod pca;
pub mod similarity;
mod utils;

pub use copac::{Copac, CopacBuilder, PartitionClusteringResult, PartitionMap};
pub use dense::Dataset;
pub use error::{copac_error, CopacError};
pub use pca::{PcaFilteredResult, PcaFilteredRunner};
pub use utils::ObjectId;
pub use utils::SortOrder;
