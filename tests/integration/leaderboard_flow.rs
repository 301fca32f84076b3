use procard_app_lib::models::leaderboard::NewScoreEntry;
use procard_app_lib::models::period::{LeaderboardPeriod, Period, Quarter};
use procard_app_lib::models::settings::Branding;
use procard_app_lib::models::technician::{Badge, StatField, TechnicianStats};
use procard_app_lib::services::form_controller::FormController;
use procard_app_lib::services::leaderboard_service::LeaderboardEngine;

fn submission(name: &str, perf: f64, impact: f64, reviews: f64, memberships: f64) -> NewScoreEntry {
    NewScoreEntry {
        stats: TechnicianStats {
            name: name.to_string(),
            avg_performance: perf,
            impact_points: impact,
            five_star_reviews: reviews,
            memberships_sold: memberships,
            ..TechnicianStats::default()
        },
        photo_url: String::new(),
        period: Period::new(Quarter::Q2, "2025").expect("period"),
    }
}

fn badges_of(engine: &LeaderboardEngine, name: &str) -> Vec<Badge> {
    engine
        .entries()
        .iter()
        .find(|entry| entry.stats.name == name)
        .map(|entry| entry.stats.badges.clone())
        .unwrap_or_default()
}

#[test]
fn badges_follow_the_whole_board() {
    let mut engine = LeaderboardEngine::new(LeaderboardPeriod::Quarterly);

    engine.add(submission("Ana", 98.0, 150.0, 20.0, 5.0)).expect("add Ana");
    assert_eq!(
        badges_of(&engine, "Ana"),
        vec![
            Badge::Mvp,
            Badge::Ironman,
            Badge::Playmaker,
            Badge::FanFavorite,
            Badge::ClubCaptain
        ]
    );

    engine.add(submission("Ben", 95.0, 180.0, 20.0, 12.0)).expect("add Ben");
    assert_eq!(badges_of(&engine, "Ana"), vec![Badge::Ironman, Badge::FanFavorite]);
    assert_eq!(
        badges_of(&engine, "Ben"),
        vec![Badge::Playmaker, Badge::FanFavorite, Badge::ClubCaptain]
    );

    let ben_id = engine
        .entries()
        .iter()
        .find(|entry| entry.stats.name == "Ben")
        .map(|entry| entry.id.clone())
        .expect("Ben present");
    engine.remove(&ben_id);

    assert_eq!(engine.entries().len(), 1);
    assert_eq!(badges_of(&engine, "Ana").len(), 5);
}

#[test]
fn all_zero_column_awards_nothing() {
    let mut engine = LeaderboardEngine::default();
    engine.add(submission("Zed", 0.0, 0.0, 0.0, 0.0)).expect("add");
    assert!(badges_of(&engine, "Zed").is_empty());
}

#[test]
fn view_ranks_by_performance_and_flags_top() {
    let mut engine = LeaderboardEngine::new(LeaderboardPeriod::Monthly);
    engine.add(submission("Low", 80.0, 1.0, 1.0, 1.0)).expect("add");
    engine.add(submission("Unknown", f64::NAN, 1.0, 1.0, 1.0)).expect("add");
    engine.add(submission("High", 99.0, 1.0, 1.0, 1.0)).expect("add");
    engine.add(submission("AlsoLow", 80.0, 1.0, 1.0, 1.0)).expect("add");

    let view = engine.view();
    assert_eq!(view.period_label, LeaderboardPeriod::Monthly);

    let names: Vec<&str> = view.rows.iter().map(|row| row.entry.stats.name.as_str()).collect();
    assert_eq!(names, vec!["High", "Low", "AlsoLow", "Unknown"]);

    let ranks: Vec<usize> = view.rows.iter().map(|row| row.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    assert!(view.rows[0].is_top);
    assert!(view.rows.iter().skip(1).all(|row| !row.is_top));

    // insertion order is untouched by viewing
    assert_eq!(engine.entries()[0].stats.name, "Low");
}

#[test]
fn blank_names_are_rejected() {
    let mut engine = LeaderboardEngine::default();
    let error = engine
        .add(submission("   ", 90.0, 1.0, 1.0, 1.0))
        .expect_err("blank name");
    assert!(error.is_validation());
    assert!(engine.entries().is_empty());
}

#[test]
fn form_card_is_submitted_without_its_manual_badges() {
    let mut form = FormController::new(
        Period::new(Quarter::Q4, "2024").expect("period"),
        Branding::default(),
    );
    form.set_name("  Casey  ");
    form.set_stat(StatField::AvgPerformance, "140");
    form.set_stat(StatField::ImpactPoints, "0");
    form.toggle_badge(Badge::ClubCaptain);

    let mut engine = LeaderboardEngine::default();
    engine.add(form.to_score_entry()).expect("add form card");

    let entry = &engine.entries()[0];
    assert_eq!(entry.stats.name, "Casey");
    assert_eq!(entry.stats.avg_performance, 100.0);
    assert_eq!(entry.period, Period::new(Quarter::Q4, "2024").expect("period"));
    assert_eq!(entry.stats.badges, vec![Badge::Ironman]);
}
