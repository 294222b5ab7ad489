//! `gcal calendars`.

use tracing::debug;

use crate::container::Services;
use crate::error::{CliError, CliResult};
use crate::output::print_list;

/// Lists the user's calendars. Hidden calendars are included when
/// `--show-hidden` is given or `calendars.showHidden` is set.
pub async fn list(services: &Services, show_hidden: bool) -> CliResult<()> {
    let show_hidden = show_hidden || services.config().show_hidden();
    debug!("listing calendars (show_hidden={})", show_hidden);

    let calendars = services
        .calendar()?
        .list_calendars(show_hidden)
        .await
        .map_err(|e| CliError::from_google(e, services.i18n()))?;
    print_list(services, &calendars, "calendars.none")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputOptions;
    use crate::container::testing::api_harness;
    use gcal_core::OutputFormat;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn calendars_body() -> serde_json::Value {
        json!({
            "items": [
                {"id": "me@example.com", "summary": "Me", "primary": true, "accessRole": "owner"},
                {"id": "team@example.com", "summary": "Team", "accessRole": "reader"}
            ]
        })
    }

    #[tokio::test]
    async fn lists_calendars_as_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(calendars_body()))
            .mount(&server)
            .await;

        let h = api_harness(OutputOptions::default(), &server.uri());
        list(&h.services, false).await.unwrap();

        let out = h.output.contents();
        assert!(out.starts_with("ID"));
        assert!(out.contains("me@example.com"));
        assert!(out.contains("team@example.com"));
    }

    #[tokio::test]
    async fn quiet_prints_ids_and_config_enables_hidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(query_param("showHidden", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(calendars_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut h = api_harness(
            OutputOptions {
                quiet: true,
                ..OutputOptions::default()
            },
            &server.uri(),
        );
        h.services
            .config_mut()
            .set("calendars.showHidden", "yes")
            .unwrap();
        list(&h.services, false).await.unwrap();

        assert_eq!(h.output.contents(), "me@example.com\nteam@example.com\n");
    }

    #[tokio::test]
    async fn empty_list_prints_message_or_empty_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let h = api_harness(OutputOptions::default(), &server.uri());
        list(&h.services, false).await.unwrap();
        assert_eq!(h.output.contents(), "No calendars found.\n");

        let h = api_harness(
            OutputOptions {
                format: Some(OutputFormat::Json),
                ..OutputOptions::default()
            },
            &server.uri(),
        );
        list(&h.services, false).await.unwrap();
        assert_eq!(h.output.contents(), "[]\n");
    }
}
