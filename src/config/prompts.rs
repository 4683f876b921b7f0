//! Prompt templates for Critic.
//!
//! Prompts can be customized by placing a `critique.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub critique: CritiquePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the critique agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CritiquePrompts {
    /// System instruction given to the model.
    pub system: String,
    /// Appended to the system instruction when markdown output is enabled.
    pub markdown: String,
    /// Task template for image critiques. `{{task}}` is the user's request.
    pub image: String,
    /// Task template for video critiques. `{{task}}` is the user's request.
    pub video: String,
}

impl Default for CritiquePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are {{agent_name}}, an experienced art director and film critic.

You give creative, specific and actionable feedback on the media you are shown.

Guidelines:
- Ground every observation in what is actually visible or audible in the media
- Cover composition, color, lighting, mood and style for images
- Cover narrative, pacing, visual style and technical execution for videos
- Use the 'web_search' tool when references to artists, techniques, genres or current trends would improve the critique
- When you use search results, mention where the information came from
- End with concrete suggestions for improvement"#
                .to_string(),

            markdown: "Use markdown to format your answers.".to_string(),

            image: "Critique this image based on {{task}}. Provide a detailed analysis.".to_string(),

            video: "Critique this video based on {{task}}. Provide a detailed analysis.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let critique_path = custom_path.join("critique.toml");
            if critique_path.exists() {
                let content = std::fs::read_to_string(&critique_path)?;
                prompts.critique = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are filled in a single left-to-right pass, so `{{name}}`
    /// text inside a substituted value is kept as written. Unknown
    /// placeholders are left untouched.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let key = &after[..close];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the system instruction for an agent.
    pub fn system_instruction(&self, agent_name: &str, markdown: bool) -> String {
        let vars = HashMap::from([("agent_name".to_string(), agent_name.to_string())]);
        let mut system = self.render_with_custom(&self.critique.system, &vars);
        if markdown {
            system.push_str("\n\n");
            system.push_str(&self.critique.markdown);
        }
        system
    }
}
