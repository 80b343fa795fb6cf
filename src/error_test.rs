use super::*;

#[test]
fn from_response_extracts_code_and_message() {
    let err = BackendError::from_response(
        403,
        r#"{"code":"42501","message":"new row violates row-level security policy for table \"profiles\""}"#,
    );
    assert!(err.is_authorization_denied());
    assert!(err.message().starts_with("new row violates"));
    assert!(matches!(err.into_profile_error(), FeedError::AuthorizationDenied(_)));
}

#[test]
fn auth_failures_stay_visible() {
    let err = BackendError::from_response(400, r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#);
    assert!(!err.is_authorization_denied());
    assert_eq!(err.into_auth_error(), FeedError::Auth("Invalid login credentials".to_owned()));
}

#[test]
fn rls_message_without_code_is_still_denied() {
    let err = BackendError::from_response(401, r#"{"msg":"violates row-level security policy"}"#);
    assert!(matches!(err.into_auth_error(), FeedError::AuthorizationDenied(_)));
}

#[test]
fn fetch_and_submit_keep_category() {
    let parse = BackendError::Parse(WireError::NotASequence);
    assert_eq!(parse.into_fetch_error(), FeedError::Fetch("response parse failed: expected a list of rows".to_owned()));
    let status = BackendError::from_response(500, "");
    assert_eq!(status.into_submit_error(), FeedError::Submit("request failed with status 500".to_owned()));
}
