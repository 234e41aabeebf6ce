// App Tests Module - Testing App behaviour
// - helpers: Mock transport and event pumping shared by the app tests
// - sync_tests: Snapshot loading, pushes and connectivity
// - messaging_tests: Sending, failures and retries
// - navigation_tests: Focus and chat selection

pub(super) mod helpers;
mod messaging_tests;
mod sync_tests;
