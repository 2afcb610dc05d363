pub mod categories;
pub mod context;

pub use categories::CachedCategorySource;
pub use context::{
    CategoryContext, CategorySnapshot, CategorySource, CategoryTaxonomy, ClassificationContext,
    ContextRetriever, FetchTimings,
};
