//! The in-memory mapping model: what to extract and how repeated values map
//! to columns and rows.

pub mod behaviour;
pub mod cardinality;
pub mod configuration;
pub mod filter;
pub mod mapping;
pub mod name_format;

pub use behaviour::MultiValueBehaviour;
pub use cardinality::{FieldLayout, ValueCounter, effective_field_count, field_names};
pub use configuration::MappingConfiguration;
pub use filter::InputFilter;
pub use mapping::{Mapping, MappingId, MappingKind};
pub use name_format::NameFormat;
