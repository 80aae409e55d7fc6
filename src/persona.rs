use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The two deployments this backend ships as. Everything that differed
/// between them is a string or an endpoint, so they collapse into one
/// config-selected variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    News,
    Cooking,
}

impl Persona {
    pub fn key(&self) -> &'static str {
        match self {
            Persona::News => "news",
            Persona::Cooking => "cooking",
        }
    }

    pub fn assistant_name(&self) -> &'static str {
        match self {
            Persona::News => "News Summarizer",
            Persona::Cooking => "Cooking Assistant",
        }
    }

    pub fn page_title(&self) -> &'static str {
        self.assistant_name()
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Persona::News => {
                "You are a personal article summarizer Assistant who knows how to \
                 take a list of article's titles and descriptions and then write a \
                 short summary of all the news articles"
            }
            Persona::Cooking => {
                "You are the best chef who is able to give advice and provide tips \
                 on food ingredient properties, recipe breakdowns, various cooking \
                 methods, dietary considerations, cooking timings, safety protocols \
                 and culinary tricks to the person you are helping cook."
            }
        }
    }

    pub fn run_instructions(&self) -> &'static str {
        match self {
            Persona::News => "Summarize the news",
            Persona::Cooking => "Answer the cooking related question",
        }
    }

    pub fn user_message(&self, input: &str) -> String {
        match self {
            Persona::News => format!("summarize the news on this topic {input}?"),
            Persona::Cooking => format!("answer the question on this topic {input}?"),
        }
    }

    /// Tool schema declared on the assistant. Both personas expose a single
    /// `get_help` function taking one topic string.
    pub fn tool_definition(&self) -> Value {
        let description = match self {
            Persona::News => "Get the list of articles/news for the given topic",
            Persona::Cooking => "Get the list of answers for the given topic",
        };
        let topic_description = match self {
            Persona::News => "The topic for the news, e.g. bitcoin",
            Persona::Cooking => {
                "The cooking related question, e.g. how do I make the soup less spicy?"
            }
        };
        json!({
            "type": "function",
            "function": {
                "name": "get_help",
                "description": description,
                "parameters": {
                    "type": "object",
                    "properties": {
                        "topic": {
                            "type": "string",
                            "description": topic_description,
                        }
                    },
                    "required": ["topic"],
                },
            },
        })
    }
}
