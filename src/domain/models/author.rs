use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
}

impl ToString for Author {
    fn to_string(&self) -> String {
        match self {
            Author::User => {
                let username = Config::get(ConfigKey::Username);
                if username.is_empty() {
                    return String::from("You");
                }
                return username;
            }
            Author::Assistant => return String::from("Assistant"),
        }
    }
}
