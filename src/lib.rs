pub mod datatypes;
pub mod record;
pub mod group;
pub mod plugin;
pub mod subrecord;
pub mod utils;
pub mod error;
pub mod io;
pub mod armor;
pub mod classifier;
pub mod selection;
pub mod template;
pub mod config;
pub mod scanner;
pub mod emitter;
pub mod session;

// 重新导出主要结构
pub use plugin::{Plugin, PluginIdentity, PluginKind, PluginStats};
pub use record::Record;
pub use group::Group;
pub use subrecord::Subrecord;
pub use armor::{ArmorRecord, ArmorType, RecordOrigin};
pub use classifier::{BipedSlotClassifier, Classifier, ClassifierKind, KeywordClassifier, SlotTag};
pub use selection::{group as group_by_slot, SlotGroup};
pub use template::{ArmorTemplate, TemplateSet};
pub use config::PatcherConfig;
pub use scanner::{scan, ScanOptions, ScanReport, ScannedPlugin};
pub use emitter::{dangling_references, dependency_closure, emit, write_patch, PatchReport, PatchResult};
pub use session::{AbortReason, Session, SessionState};
pub use error::{ConfigError, EmitError, LoadError, SelectionError, SessionError, WriteError};

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["esp", "esm"];
