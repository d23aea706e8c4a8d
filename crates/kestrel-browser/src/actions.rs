//! Page-action boundary.
//!
//! Each action takes a structured parameter value and reports a uniform
//! [`ActionResult`]. In current scope the actions describe what they would do
//! rather than driving the page; the surface exists so callers can program
//! against it while the interaction layer lands.

use serde::{Deserialize, Serialize};

/// Uniform outcome of a page action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub done: bool,
    pub content: Vec<String>,
    pub error: Vec<String>,
}

impl ActionResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            done: true,
            content: vec![message.into()],
            error: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateParams {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickElementParams {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTextParams {
    pub index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchTabParams {
    pub page_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTabParams {
    pub page_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractContentParams {
    pub page_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollParams {
    pub amount: u32,
}

#[derive(Debug, Clone, Default)]
pub struct BrowserActions;

impl BrowserActions {
    pub fn new() -> Self {
        Self
    }

    pub async fn search(&self, params: SearchParams) -> ActionResult {
        ActionResult::ok(format!("Searching for: {}", params.query))
    }

    pub async fn navigate(&self, params: NavigateParams) -> ActionResult {
        ActionResult::ok(format!("Navigating to URL: {}", params.url))
    }

    pub async fn go_back(&self) -> ActionResult {
        ActionResult::ok("Navigating back to the previous page")
    }

    pub async fn click_element(&self, params: ClickElementParams) -> ActionResult {
        let mut message = format!("Clicking element at index: {}", params.index);
        if let Some(xpath) = &params.xpath {
            message.push_str(&format!(" with XPath: {xpath}"));
        }
        ActionResult::ok(message)
    }

    pub async fn input_text(&self, params: InputTextParams) -> ActionResult {
        ActionResult::ok(format!("Inputting text: {}", params.text))
    }

    pub async fn switch_tab(&self, params: SwitchTabParams) -> ActionResult {
        ActionResult::ok(format!("Switching to tab with page id: {}", params.page_id))
    }

    pub async fn open_tab(&self, params: OpenTabParams) -> ActionResult {
        ActionResult::ok(format!("Opening a new tab with page id: {}", params.page_id))
    }

    pub async fn extract_content(&self, params: ExtractContentParams) -> ActionResult {
        ActionResult::ok(format!("Extracting content from page id: {}", params.page_id))
    }

    pub async fn scroll_up(&self, params: ScrollParams) -> ActionResult {
        ActionResult::ok(format!("Scrolling up by {} pixels", params.amount))
    }

    pub async fn scroll_down(&self, params: ScrollParams) -> ActionResult {
        ActionResult::ok(format!("Scrolling down by {} pixels", params.amount))
    }

    pub async fn send_keys(&self) -> ActionResult {
        ActionResult::ok("Sending special keys (e.g. Enter, Backspace)")
    }

    pub async fn scroll_to_text(&self) -> ActionResult {
        ActionResult::ok("Scrolling until specific text or element is visible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_actions_report_done_with_content() {
        let actions = BrowserActions::new();

        let result = actions
            .navigate(NavigateParams {
                url: "https://example.com".into(),
            })
            .await;

        assert!(result.done);
        assert_eq!(result.content, vec!["Navigating to URL: https://example.com"]);
        assert!(result.error.is_empty());
    }

    #[tokio::test]
    async fn test_click_mentions_xpath_only_when_present() {
        let actions = BrowserActions::new();

        let bare = actions
            .click_element(ClickElementParams {
                index: 3,
                xpath: None,
            })
            .await;
        assert_eq!(bare.content, vec!["Clicking element at index: 3"]);

        let with_xpath = actions
            .click_element(ClickElementParams {
                index: 3,
                xpath: Some("//button[1]".into()),
            })
            .await;
        assert_eq!(
            with_xpath.content,
            vec!["Clicking element at index: 3 with XPath: //button[1]"]
        );
    }

    #[test]
    fn test_params_deserialize_from_json() {
        let params: ClickElementParams =
            serde_json::from_str(r#"{"index": 7, "xpath": "//a"}"#).unwrap();
        assert_eq!(params.index, 7);
        assert_eq!(params.xpath.as_deref(), Some("//a"));

        let params: ScrollParams = serde_json::from_str(r#"{"amount": 250}"#).unwrap();
        assert_eq!(params.amount, 250);
    }

    #[test]
    fn test_result_serializes_with_stable_field_names() {
        let result = ActionResult::ok("ready");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["done"], true);
        assert_eq!(json["content"][0], "ready");
        assert!(json["error"].as_array().unwrap().is_empty());
    }
}
