//! `test-utils` is used for testing in both `fetchpool-lib` and `fetchpool-bin`.
//! This crate does not depend on `fetchpool-lib` or `fetchpool-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status to every
/// request of any method
///
/// Additional calls on the `ResponseTemplate` can be appended, e.g.
/// `mock_server!(200, set_body_string("ok"))`.
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from_u16($status).unwrap());
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::any()).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Mount a route on an existing mock server, answering `$path` with `$status`
///
/// Appended calls work the same way as for [`mock_server!`].
#[macro_export]
macro_rules! mock_route {
    ($server:expr, $path:expr, $status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from_u16($status).unwrap());
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::path($path))
            .respond_with(template)
            .mount(&$server)
            .await;
    }};
}

/// Gets the "main" binary command (e.g. `fetchpool`)
#[macro_export]
macro_rules! main_command {
    () => {
        assert_cmd::cargo::cargo_bin_cmd!("fetchpool")
    };
}
