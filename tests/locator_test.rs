mod common;

use std::time::Duration;

use tokio::time::Instant;
use yuanbao_gateway::infrastructure::Locator;
use yuanbao_gateway::workflow::selectors::{MESSAGE_INPUT, SEND_BUTTON};

use common::{FakePage, PageState};

const POLL: Duration = Duration::from_millis(500);

#[tokio::test(start_paused = true)]
async fn test_first_matching_candidate_wins() {
    let page = FakePage::new(PageState::ready());
    let locator = Locator::required(
        "发送按钮",
        ["#missing", SEND_BUTTON[0], MESSAGE_INPUT[0]],
        Duration::from_secs(1),
    );

    let selector = locator.find(&page, POLL).await.unwrap();

    assert_eq!(selector, SEND_BUTTON[0]);
}

#[tokio::test(start_paused = true)]
async fn test_required_locator_exhausts_every_candidate() {
    let page = FakePage::new(PageState::ready());
    let start = Instant::now();

    let err = Locator::required("输入框", ["#a", "#b"], Duration::from_secs(1))
        .resolve(&page, POLL)
        .await
        .unwrap_err();

    assert_eq!(err.tried, 2);
    assert_eq!(err.to_string(), "无法定位输入框（已尝试 2 个选择器）");
    // 每个候选各自等满上限
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_advisory_locator_gives_up_quietly() {
    let page = FakePage::new(PageState::ready());

    let advisory = Locator::advisory("欢迎语", ["#a"], Duration::from_secs(1));
    assert_eq!(advisory.resolve(&page, POLL).await.unwrap(), None);

    // find 不区分建议性，未命中一律报错
    assert!(advisory.find(&page, POLL).await.is_err());
}
