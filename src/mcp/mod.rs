// ============================================================================
// MCP Module - server spec conversion shared by the tool codecs
// ============================================================================

mod spec;
mod toml_convert;
mod validation;

pub use spec::{server_from_spec, server_to_spec};
pub(crate) use spec::{json_to_string_map, string_map_to_json};
pub use toml_convert::{json_server_to_toml_table, server_to_toml_table, toml_entry_to_json_spec};
pub use validation::validate_server_spec;
