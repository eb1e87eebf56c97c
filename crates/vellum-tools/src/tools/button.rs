use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::schema::ToolSpec;

pub const INTERACTIVE_BUTTON_TOOL_NAME: &str = "interactive_button";

pub struct InteractiveButtonSpec;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InteractiveButtonParams {
    /// Button label
    pub message: String,
    /// Text sent on the user's behalf when the button is clicked
    pub command: String,
}

impl ToolSpec for InteractiveButtonSpec {
    type Params = InteractiveButtonParams;

    const NAME: &'static str = INTERACTIVE_BUTTON_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Quick reply";
    const DESCRIPTION: &'static str =
        "Offer the user a one-click follow-up question or answer choice";
    const KIND: ArtifactKind = ArtifactKind::Button;
    const EXAMPLE: &'static str = r#"message="Explain step 2", command="Explain step 2 in more detail""#;
}
