//! HTML views
//!
//! The index page and the success/error views rendered by the trigger
//! endpoint.

/// Index page listing the available endpoints
pub(super) fn index_page() -> &'static str {
    r#"<html>
  <head>
    <title>Lab Feature ETL API</title>
  </head>
  <body>
    <h1>Lab Feature ETL API</h1>
    <p>Available endpoints:</p>
    <ul>
      <li><a href="/trigger-etl">Trigger ETL</a></li>
      <li><a href="/etl-results">ETL Results</a></li>
    </ul>
  </body>
</html>
"#
}

/// Success view for a completed ETL run
pub(super) fn success_page(status_code: u16, message: &str) -> String {
    format!(
        r#"<html>
  <head>
    <title>ETL Success</title>
  </head>
  <body>
    <h1>ETL completed ({status_code})</h1>
    <p>{message}</p>
    <p><a href="/etl-results">View results</a></p>
  </body>
</html>
"#
    )
}

/// Error view for a failed ETL run
pub(super) fn error_page(status_code: u16, message: &str) -> String {
    format!(
        r#"<html>
  <head>
    <title>ETL Error</title>
  </head>
  <body>
    <h1>ETL failed ({status_code})</h1>
    <p>{message}</p>
    <p><a href="/">Back</a></p>
  </body>
</html>
"#
    )
}
