use crate::api::{GenerateContentResponse, Part};

/// A tool call the model is still composing. `code` is `None` when the call
/// arrived without a code argument.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolInvocation {
    pub code: Option<String>,
}

/// One streaming step of a model response.
///
/// Each payload is independently optional because the backend may deliver
/// any subset of them in a single step. `execution_result` distinguishes
/// `Some("")` (the tool ran and printed nothing) from `None` (no result in
/// this step).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseFragment {
    pub text_delta: Option<String>,
    pub tool_invocations: Option<Vec<ToolInvocation>>,
    pub executable_code: Option<String>,
    pub execution_result: Option<String>,
}

impl ResponseFragment {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text_delta: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn tool_invocations(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            tool_invocations: Some(invocations),
            ..Self::default()
        }
    }

    pub fn executable_code(code: impl Into<String>) -> Self {
        Self {
            executable_code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn execution_result(output: impl Into<String>) -> Self {
        Self {
            execution_result: Some(output.into()),
            ..Self::default()
        }
    }

    /// Collapse the parts of one response chunk into a fragment.
    ///
    /// Text parts are concatenated in order. For code and results the last
    /// occurrence wins, since both are delivered as complete snapshots.
    pub fn from_parts(parts: &[Part]) -> Self {
        let mut fragment = Self::default();
        let mut invocations = Vec::new();

        for part in parts {
            if let Some(text) = &part.text {
                fragment
                    .text_delta
                    .get_or_insert_with(String::new)
                    .push_str(text);
            }
            if let Some(call) = &part.function_call {
                invocations.push(ToolInvocation {
                    code: call.code_argument().map(str::to_owned),
                });
            }
            if let Some(code) = &part.executable_code {
                fragment.executable_code = Some(code.code.clone());
            }
            if let Some(result) = &part.code_execution_result {
                fragment.execution_result = Some(result.output.clone().unwrap_or_default());
            }
        }

        if !invocations.is_empty() {
            fragment.tool_invocations = Some(invocations);
        }
        fragment
    }

    pub fn is_empty(&self) -> bool {
        self.text_delta.is_none()
            && self.tool_invocations.is_none()
            && self.executable_code.is_none()
            && self.execution_result.is_none()
    }
}

impl From<&GenerateContentResponse> for ResponseFragment {
    fn from(response: &GenerateContentResponse) -> Self {
        Self::from_parts(response.parts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> ResponseFragment {
        let response: GenerateContentResponse = serde_json::from_str(raw).expect("parse");
        ResponseFragment::from(&response)
    }

    #[test]
    fn text_parts_are_concatenated() {
        let fragment = decode(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        );
        assert_eq!(fragment.text_delta.as_deref(), Some("Hello, world"));
        assert!(fragment.executable_code.is_none());
        assert!(fragment.tool_invocations.is_none());
    }

    #[test]
    fn empty_execution_output_is_a_present_result() {
        let fragment = decode(
            r#"{"candidates":[{"content":{"parts":[{"codeExecutionResult":{"outcome":"OUTCOME_OK"}}]}}]}"#,
        );
        assert_eq!(fragment.execution_result.as_deref(), Some(""));
    }

    #[test]
    fn function_calls_become_tool_invocations() {
        let fragment = decode(
            r#"{"candidates":[{"content":{"parts":[
                {"functionCall":{"name":"exec","args":{"code":"print("}}},
                {"functionCall":{"name":"exec"}}
            ]}}]}"#,
        );
        assert_eq!(
            fragment.tool_invocations,
            Some(vec![
                ToolInvocation {
                    code: Some("print(".into())
                },
                ToolInvocation { code: None },
            ])
        );
    }

    #[test]
    fn chunk_without_parts_is_empty() {
        let fragment = decode(r#"{"candidates":[{"finishReason":"STOP"}]}"#);
        assert!(fragment.is_empty());
    }
}
