pub mod card;
pub mod container;
pub mod loaders;

pub use card::{Card, CardMove, CardPatch, NewCard};
pub use container::Container;
pub use loaders::{load_all_jobs, load_job, Job};
