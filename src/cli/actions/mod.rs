pub mod run;

use crate::collectors::PluginConfig;

#[derive(Debug)]
pub enum Action {
    Run {
        config: PluginConfig,
        push_url: Option<String>,
    },
}
