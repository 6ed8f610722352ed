//! Job board: posting, search, detail and saved jobs

mod common;

use chrono::{Duration, Utc};
use common::*;
use gigit::applications::{ApplicationManager, ApplyInput};
use gigit::database::models::{ApplicationStatus, JobStatus, JobType, Urgency};
use gigit::error::MarketplaceError;
use gigit::jobs::{JobBoard, JobSearch, JobSort, SavedJobs};

#[tokio::test]
async fn test_create_draft_and_published_jobs() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;

    let published = post_job(&db, &business, job_input("Welder")).await;
    assert_eq!(published.status, JobStatus::Active);
    assert!(published.published_at.is_some());
    assert_eq!(published.urgency, Urgency::Medium);
    assert_eq!(published.number_of_workers_needed, 1);

    let mut draft_input = job_input("Painter");
    draft_input.publish = false;
    let draft = post_job(&db, &business, draft_input).await;
    assert_eq!(draft.status, JobStatus::Draft);
    assert!(draft.published_at.is_none());

    let mut inverted = job_input("Roofer");
    inverted.budget_min = Some(50.0);
    inverted.budget_max = Some(10.0);
    let err = JobBoard::new(db.pool().clone()).create(&business.id, inverted).await;
    assert!(matches!(err, Err(MarketplaceError::ValidationError(_))));
    Ok(())
}

#[tokio::test]
async fn test_search_only_lists_open_jobs() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let board = JobBoard::new(db.pool().clone());

    post_job(&db, &business, job_input("Open job")).await;

    let mut draft = job_input("Draft job");
    draft.publish = false;
    post_job(&db, &business, draft).await;

    let mut expired = job_input("Expired job");
    expired.expires_at = Some(Utc::now() - Duration::days(1));
    post_job(&db, &business, expired).await;

    let page = board.search(&JobSearch::default()).await?;
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.jobs.len(), 1);
    assert_eq!(page.jobs[0].job.title, "Open job");
    assert_eq!(
        page.jobs[0].business.as_ref().map(|b| b.company_name.as_str()),
        Some("Acme")
    );
    Ok(())
}

#[tokio::test]
async fn test_search_filters_and_skill_total() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let board = JobBoard::new(db.pool().clone());
    let welding = skill_id(&db, "Welding").await;
    let plumbing = skill_id(&db, "Plumbing").await;

    for i in 0..3 {
        let mut input = job_input(&format!("Pipe welder {}", i));
        input.required_skills = vec![welding.clone()];
        post_job(&db, &business, input).await;
    }
    let mut plumber = job_input("Plumber");
    plumber.required_skills = vec![plumbing.clone()];
    plumber.job_location_city = Some("Dallas".to_string());
    post_job(&db, &business, plumber).await;

    let by_skill = board
        .search(&JobSearch {
            skills: Some(format!("{}, unknown-skill", welding)),
            limit: Some(2),
            ..JobSearch::default()
        })
        .await?;
    assert_eq!(by_skill.pagination.total, 3);
    assert_eq!(by_skill.pagination.total_pages, 2);
    assert_eq!(by_skill.jobs.len(), 2);
    assert_eq!(by_skill.jobs[0].required_skills_data[0].name, "Welding");

    let by_text = board
        .search(&JobSearch {
            search: Some("PLUMB".to_string()),
            ..JobSearch::default()
        })
        .await?;
    assert_eq!(by_text.pagination.total, 1);

    let by_city = board
        .search(&JobSearch {
            city: Some("dal".to_string()),
            ..JobSearch::default()
        })
        .await?;
    assert_eq!(by_city.jobs.len(), 1);
    assert_eq!(by_city.jobs[0].job.title, "Plumber");

    let no_match = board
        .search(&JobSearch {
            min_budget: Some(1000.0),
            ..JobSearch::default()
        })
        .await?;
    assert_eq!(no_match.pagination.total, 0);
    assert_eq!(no_match.pagination.total_pages, 0);
    Ok(())
}

#[tokio::test]
async fn test_search_sorts_by_urgency_and_budget() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let board = JobBoard::new(db.pool().clone());

    for (title, urgency, max) in [
        ("Low", Urgency::Low, 30.0),
        ("Urgent", Urgency::Urgent, 45.0),
        ("High", Urgency::High, 90.0),
        ("Medium", Urgency::Medium, 60.0),
    ] {
        let mut input = job_input(title);
        input.urgency = Some(urgency);
        input.budget_max = Some(max);
        post_job(&db, &business, input).await;
    }

    let by_urgency = board
        .search(&JobSearch {
            sort_by: JobSort::Urgency,
            ..JobSearch::default()
        })
        .await?;
    let titles: Vec<&str> = by_urgency.jobs.iter().map(|j| j.job.title.as_str()).collect();
    assert_eq!(titles, vec!["Urgent", "High", "Medium", "Low"]);

    let by_budget = board
        .search(&JobSearch {
            sort_by: JobSort::BudgetHigh,
            ..JobSearch::default()
        })
        .await?;
    assert_eq!(by_budget.jobs[0].job.title, "High");
    Ok(())
}

#[tokio::test]
async fn test_update_requires_owner_and_stamps_publish() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let (_, rival) = create_business(&db, "owner@rival.test", "Rival").await;
    let board = JobBoard::new(db.pool().clone());

    let mut draft_input = job_input("Carpenter");
    draft_input.publish = false;
    let draft = post_job(&db, &business, draft_input).await;

    let forbidden = board.update(&draft.id, &rival.id, job_input("Carpenter")).await;
    assert!(matches!(forbidden, Err(MarketplaceError::PermissionError(_))));

    let mut update = job_input("Senior carpenter");
    update.publish = false;
    update.status = Some(JobStatus::Active);
    update.job_type = Some(JobType::Bulk);
    update.number_of_workers_needed = Some(3);
    let updated = board.update(&draft.id, &business.id, update).await?;
    assert_eq!(updated.title, "Senior carpenter");
    assert_eq!(updated.status, JobStatus::Active);
    assert_eq!(updated.number_of_workers_needed, 3);
    let first_published = updated.published_at.expect("activation stamps published_at");

    let mut close = job_input("Senior carpenter");
    close.status = Some(JobStatus::Closed);
    let closed = board.update(&draft.id, &business.id, close).await?;
    assert_eq!(closed.status, JobStatus::Closed);
    assert_eq!(closed.published_at, Some(first_published));
    Ok(())
}

#[tokio::test]
async fn test_job_detail_for_worker_viewer() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let (_, worker) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let job = post_job(&db, &business, job_input("Mason")).await;
    let board = JobBoard::new(db.pool().clone());

    let anonymous = board.get(&job.id, None).await?;
    assert!(!anonymous.has_applied);
    assert!(!anonymous.is_saved);
    assert_eq!(anonymous.business.company_name, "Acme");

    ApplicationManager::new(db.pool().clone())
        .apply(&worker, &job.id, ApplyInput::default())
        .await?;
    SavedJobs::new(db.pool().clone()).save(&worker.id, &job.id).await?;

    let detail = board.get(&job.id, Some(&worker.id)).await?;
    assert!(detail.has_applied);
    assert!(detail.is_saved);
    assert_eq!(detail.application_count, 1);
    assert_eq!(
        detail.application.map(|a| a.status),
        Some(ApplicationStatus::Pending)
    );

    assert!(matches!(
        board.get("missing", None).await,
        Err(MarketplaceError::NotFoundError(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_delete_job_refused_with_contracts() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let (_, worker) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let board = JobBoard::new(db.pool().clone());
    let hiring = ApplicationManager::new(db.pool().clone());

    let disposable = post_job(&db, &business, job_input("Temp")).await;
    hiring.apply(&worker, &disposable.id, ApplyInput::default()).await?;
    board.delete(&disposable.id, &business.id).await?;
    assert!(board.find(&disposable.id).await?.is_none());

    let staffed = post_job(&db, &business, job_input("Staffed")).await;
    let application = hiring.apply(&worker, &staffed.id, ApplyInput::default()).await?;
    hiring
        .update_status(&application.id, &business.id, ApplicationStatus::Accepted)
        .await?;

    let refused = board.delete(&staffed.id, &business.id).await;
    assert!(matches!(refused, Err(MarketplaceError::ConflictError(_))));
    Ok(())
}

#[tokio::test]
async fn test_saved_jobs() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let (_, worker) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let saved = SavedJobs::new(db.pool().clone());

    let first = post_job(&db, &business, job_input("First")).await;
    let second = post_job(&db, &business, job_input("Second")).await;

    saved.save(&worker.id, &first.id).await?;
    saved.save(&worker.id, &second.id).await?;

    let again = saved.save(&worker.id, &first.id).await;
    match again {
        Err(MarketplaceError::ValidationError(msg)) => assert_eq!(msg, "Job already saved"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(
        saved.save(&worker.id, "missing").await,
        Err(MarketplaceError::NotFoundError(_))
    ));

    let list = saved.list(&worker.id).await?;
    let titles: Vec<&str> = list.iter().map(|s| s.job_post.job.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First"]);

    saved.unsave(&worker.id, &first.id).await?;
    assert_eq!(saved.list(&worker.id).await?.len(), 1);
    assert!(matches!(
        saved.unsave(&worker.id, &first.id).await,
        Err(MarketplaceError::NotFoundError(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_business_job_list() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    let board = JobBoard::new(db.pool().clone());

    post_job(&db, &business, job_input("Active")).await;
    let mut draft = job_input("Draft");
    draft.publish = false;
    post_job(&db, &business, draft).await;

    assert_eq!(board.list_for_business(&business.id, None).await?.len(), 2);
    let drafts = board.list_for_business(&business.id, Some(JobStatus::Draft)).await?;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].job.title, "Draft");
    assert_eq!(drafts[0].application_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_search_far_past_last_page_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (_, business) = create_business(&db, "owner@acme.test", "Acme").await;
    post_job(&db, &business, job_input("Only job")).await;

    let page = JobBoard::new(db.pool().clone())
        .search(&JobSearch {
            page: Some(i64::MAX),
            limit: Some(100),
            ..JobSearch::default()
        })
        .await?;
    assert!(page.jobs.is_empty());
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.pagination.page, i64::MAX);
    Ok(())
}
