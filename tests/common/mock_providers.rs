/*!
 * Mock provider setups shared across the test suite
 */

use gamemtl::providers::mock::MockProvider;

/// Translations covering every string in the fixture project
pub const FIXTURE_SCRIPT: &[(&str, &str)] = &[
    ("夢魔の城", "Castle of the Succubus"),
    ("リリィ", "Lily"),
    ("夢魔の少女。", "A succubus girl."),
    ("レベル", "Level"),
    ("戦う", "Fight"),
    ("常時ダッシュ", "Always Dash"),
    ("火", "Fire"),
    ("おはよう", "Good morning."),
    (
        "いらっしゃい。\nゆっくりしていってね。",
        "Welcome.\nMake yourself at home.",
    ),
    ("はい", "Yes"),
    ("いいえ", "No"),
    ("夢魔の城・入口", "Castle Entrance"),
];

/// Scripted provider answering every fixture string
pub fn fixture_provider() -> MockProvider {
    MockProvider::scripted(FIXTURE_SCRIPT)
}
