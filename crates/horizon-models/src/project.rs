//! Project model: one HTML document plus the conversation that produced it.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Starter document for a freshly created project.
pub const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>My Website</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .container {
            background: white;
            padding: 40px;
            border-radius: 20px;
            box-shadow: 0 20px 40px rgba(0,0,0,0.1);
            text-align: center;
            max-width: 600px;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Welcome to Event Horizon</h1>
        <p>Describe what you want to build and the complete HTML will appear here.</p>
    </div>
</body>
</html>"#;

/// A persisted project.
///
/// Field names serialize in camelCase so exported projects match the
/// `{id, name, htmlCode, messages, createdAt, updatedAt}` layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub html_code: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = crate::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            html_code: DEFAULT_HTML_TEMPLATE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Default name for the project created after `existing` others.
    pub fn default_name(existing: usize) -> String {
        format!("Project {}", existing + 1)
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn set_html_code(&mut self, code: impl Into<String>) {
        self.html_code = code.into();
        self.touch();
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.touch();
    }

    fn touch(&mut self) {
        // Keep updated_at strictly increasing even within the same millisecond.
        self.updated_at = crate::now_millis().max(self.updated_at + 1);
    }
}
