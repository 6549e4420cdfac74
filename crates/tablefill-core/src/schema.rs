use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::task::TaskDescriptor;

/// Emit the JSON Schema for the task descriptor accepted by a worker.
pub fn task_json_schema() -> RootSchema {
    schema_for!(TaskDescriptor)
}
