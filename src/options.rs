use serde::Serialize;

use crate::cache::ChannelCache;
use crate::domain::{ChannelOption, Country};
use crate::error::TvPlanError;

/// One entry of the plugin's `custom_fields` sequence. Optional attributes
/// are omitted from the YAML entirely rather than emitted as nulls.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub keyname: String,
    pub field_type: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learn_more_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChannelOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

impl FieldDescriptor {
    fn new(keyname: &str, field_type: &str, name: &str, description: String) -> Self {
        Self {
            keyname: keyname.to_string(),
            field_type: field_type.to_string(),
            name: name.to_string(),
            description,
            github_url: None,
            learn_more_url: None,
            placeholder: None,
            help_text: None,
            multiple: None,
            options: None,
            default: None,
            optional: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub options: Vec<ChannelOption>,
    /// Country ids present in the channel cache but absent from the country
    /// list; skipped with a warning, never fatal.
    pub unknown_country_ids: Vec<String>,
}

/// Joins every (country, channel) pair that carries a channel id into a
/// label/value option, sorted case-insensitively by label. Sort stability
/// for duplicate labels is not guaranteed.
pub fn build_channel_options(countries: &[Country], cache: &ChannelCache) -> JoinOutcome {
    let country_by_id: std::collections::HashMap<&str, &Country> = countries
        .iter()
        .map(|country| (country.id.as_str(), country))
        .collect();

    let mut outcome = JoinOutcome::default();
    for (country_id, entry) in cache {
        let Some(country) = country_by_id.get(country_id.as_str()) else {
            outcome.unknown_country_ids.push(country_id.clone());
            continue;
        };
        for channel in &entry.data {
            let Some(channel_id) = channel.id.as_deref() else {
                continue;
            };
            let channel_name = channel.display_name();
            outcome.options.push(ChannelOption {
                label: format!("{} - {}", country.display_name(), channel_name),
                value: format!("{channel_id}|{channel_name}"),
            });
        }
    }

    outcome
        .options
        .sort_by_cached_key(|option| option.label.to_lowercase());
    outcome
}

/// The full `custom_fields` document: fixed descriptors plus the generated
/// channel picker. Pure formatting; counts only feed the descriptive text.
pub fn build_custom_fields(
    options: Vec<ChannelOption>,
    country_count: usize,
) -> Vec<FieldDescriptor> {
    let channel_count = options.len();

    let mut about = FieldDescriptor::new(
        "about",
        "author_bio",
        "About This Plugin",
        format!(
            "Display TV program schedules from {country_count} countries with {channel_count} channels available.<br /><br />\n\
             <strong>Features:</strong><br />\n\
             ● Live TV schedule with current and upcoming programs<br />\n\
             ● Support for channels from multiple countries<br />\n\
             ● Highlights currently airing programs<br />\n\
             <strong>Setup Requirements:</strong><br />\n\
             ● Free API key from <a href='https://tv-plan.org/#/apiarea'>TV-Plan.org</a> (takes less than a minute)<br />\n\
             ● Each channel uses one API call per refresh<br />\n\
             ● Recommended: 5 channels with hourly refresh or evening-only schedule<br />\n"
        ),
    );
    about.github_url = Some("https://github.com/ExcuseMi/trmnl-tv-guide.plugin".to_string());
    about.learn_more_url = Some("https://tv-plan.org/#/apiarea".to_string());

    let mut api_token = FieldDescriptor::new(
        "api_token",
        "string",
        "TV-Plan API Token",
        "Enter your API token from <a href=\"https://tv-plan.org/api-v1.php#/apiarea\">TV-Plan.org</a>. An API token is required to fetch TV program data.".to_string(),
    );
    api_token.placeholder = Some("Enter your TV-Plan API token".to_string());

    let mut channels = FieldDescriptor::new(
        "channels",
        "select",
        &format!("TV Channels: {channel_count}"),
        "Select the TV channels you want to track. Channels are organized by country and sorted alphabetically.".to_string(),
    );
    channels.multiple = Some(true);
    channels.help_text = Some(
        "Use <kbd>⌘</kbd>+<kbd>click</kbd> (Mac) or <kbd>ctrl</kbd>+<kbd>click</kbd> (Windows) to select multiple items. Use <kbd>Shift</kbd>+<kbd>click</kbd> to select a whole range at once.".to_string(),
    );
    channels.options = Some(options);

    let mut time_format = FieldDescriptor::new(
        "time_format",
        "select",
        "Time Format",
        "Choose how times are displayed on your TV guide.".to_string(),
    );
    time_format.options = Some(vec![
        ChannelOption {
            label: "24-hour (23:00)".to_string(),
            value: "24".to_string(),
        },
        ChannelOption {
            label: "12-hour (11:00 PM)".to_string(),
            value: "12".to_string(),
        },
    ]);
    time_format.default = Some("24".to_string());
    time_format.optional = Some(true);

    let mut show_title_bar = FieldDescriptor::new(
        "show_title_bar",
        "select",
        "Show Title Bar",
        "Display or hide the \"TV Guide\" title bar at the bottom of the screen.".to_string(),
    );
    show_title_bar.options = Some(vec![
        ChannelOption {
            label: "Show".to_string(),
            value: "true".to_string(),
        },
        ChannelOption {
            label: "Hide".to_string(),
            value: "false".to_string(),
        },
    ]);
    show_title_bar.default = Some("true".to_string());
    show_title_bar.optional = Some(true);

    vec![about, api_token, channels, time_format, show_title_bar]
}

pub fn to_yaml(fields: &[FieldDescriptor]) -> Result<String, TvPlanError> {
    serde_yaml::to_string(fields).map_err(|err| TvPlanError::YamlEmit(err.to_string()))
}
