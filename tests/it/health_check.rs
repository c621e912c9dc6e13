use crate::support::test_context;

#[tokio::test]
async fn health_check_works() {
    let mut ctx = test_context!();
    ctx.logout();

    let response = ctx.get("/health_check").await;

    assert!(response.status().is_success());
}
