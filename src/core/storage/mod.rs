//! Storage layer: directories, configurations and index sessions.
//!
//! # Architecture
//!
//! - **DirectoryRegistry**: one cached directory handle per index name
//! - **ConfigurationRegistry**: per-index settings and schema
//! - **SessionRegistry**: writer/reader lifecycle and exclusive gates
//! - **DocumentMapper**: item <-> stored document conversion
//! - **HealthChecker**: consistency checks on scratch copies
//!
//! # Storage Structure
//!
//! ```text
//! {index_dir}/
//! ├── BlogPost/               # live index
//! │   ├── meta.json
//! │   └── [segment files]
//! ├── BlogPost_temp/          # rebuilt index awaiting swap
//! └── BlogPost_{uuid}/        # short-lived health-check copy
//! ```

pub mod configuration;
pub mod directory;
pub mod mapper;
pub mod schema;
pub mod session;
pub mod validator;

pub use configuration::{ConfigurationRegistry, IndexConfiguration};
pub use directory::{validate_index_name, DirectoryRegistry};
pub use mapper::{DocumentMapper, JsonDocumentMapper};
pub use schema::{Analyzer, FieldKind, FieldSpec, IndexSchema};
pub use session::{ExclusiveGate, IndexSession, SessionRegistry};
pub use validator::{HealthChecker, HealthReport};
