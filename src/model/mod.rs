//! Records served by the entity API.
//!
//! These are plain serde types shared by the store, the service and the
//! HTTP layer:
//!
//! ```text
//! Project ──┬── Entity (asset, shot, sequence, episode, ...)
//!           │     ├── parent_id  ─► Entity
//!           │     ├── episode_id ─► Entity (kind = episode)
//!           │     ├── Task ─► TaskType
//!           │     │    └── PreviewFile
//!           │     └── EntityVersion
//!           └── team ─► Person (role)
//! ```

mod criteria;
mod entity;
mod person;
mod task;

pub use criteria::{Criteria, EntityField, FilterValue, Relations};
pub use entity::{Entity, EntityKind, EntityVersion, EntityWithTasks, FullEntity, NewEntity};
pub use person::{Caller, Person, Project, Role};
pub use task::{PreviewFile, Task, TaskType};
