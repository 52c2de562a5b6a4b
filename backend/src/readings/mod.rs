pub mod model;
pub mod repository;
pub mod repository_sqlx;

pub use model::Reading;
pub use repository::ReadingsRepository;
pub use repository_sqlx::SqlxReadingsRepository;
