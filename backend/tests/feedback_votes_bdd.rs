//! Behaviour tests for idempotent feedback voting.

use std::cell::RefCell;

use neighbourly::domain::ports::{FIXTURE_BORROWER, FIXTURE_LENDER};
use neighbourly::domain::{IssueNumber, UserId, VoteTally};
use neighbourly::test_support::LendingHarness;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

struct FeedbackWorld {
    runtime: Runtime,
    harness: LendingHarness,
    tallies: RefCell<Vec<VoteTally>>,
}

impl FeedbackWorld {
    fn vote(&self, issue: u32, user: UserId) {
        let issue = IssueNumber::new(issue).expect("valid issue number");
        let tally = self
            .runtime
            .block_on(self.harness.state.feedback.upvote(issue, user))
            .expect("vote recorded");
        self.tallies.borrow_mut().push(tally);
    }
}

#[fixture]
fn world() -> FeedbackWorld {
    FeedbackWorld {
        runtime: Runtime::new().expect("tokio runtime should initialize"),
        harness: LendingHarness::new(),
        tallies: RefCell::new(Vec::new()),
    }
}

#[given("nobody has voted yet")]
fn nobody_has_voted_yet(world: &FeedbackWorld) {
    assert!(world.tallies.borrow().is_empty());
}

#[when("two simultaneous votes from the borrower reach issue {issue}")]
fn the_borrower_votes_twice_at_the_same_time(world: &FeedbackWorld, issue: u32) {
    let issue = IssueNumber::new(issue).expect("valid issue number");
    let feedback = &world.harness.state.feedback;
    let (first, second) = world.runtime.block_on(async {
        futures::join!(
            feedback.upvote(issue, FIXTURE_BORROWER.user_id),
            feedback.upvote(issue, FIXTURE_BORROWER.user_id),
        )
    });
    world
        .tallies
        .borrow_mut()
        .extend([first.expect("first vote"), second.expect("second vote")]);
}

#[when("the borrower votes for issue {issue}")]
fn the_borrower_votes_for_issue(world: &FeedbackWorld, issue: u32) {
    world.vote(issue, FIXTURE_BORROWER.user_id);
}

#[when("the lender votes for issue {issue}")]
fn the_lender_votes_for_issue(world: &FeedbackWorld, issue: u32) {
    world.vote(issue, FIXTURE_LENDER.user_id);
}

#[then("the latest tally for issue {issue} is {voters}")]
fn the_latest_tally_for_issue_is(world: &FeedbackWorld, issue: u32, voters: u64) {
    let tallies = world.tallies.borrow();
    let latest = tallies
        .iter()
        .filter(|t| t.issue_number.get() == issue)
        .map(|t| t.voters)
        .max()
        .expect("a vote was cast");
    assert_eq!(latest, voters);
}

#[then("exactly one vote was newly recorded")]
fn exactly_one_vote_was_newly_recorded(world: &FeedbackWorld) {
    let tallies = world.tallies.borrow();
    assert_eq!(tallies.iter().filter(|t| t.newly_recorded).count(), 1);
}

#[scenario(
    path = "tests/features/feedback_votes.feature",
    name = "Simultaneous votes from one member count once"
)]
fn simultaneous_votes_count_once(world: FeedbackWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/feedback_votes.feature",
    name = "Votes from different members accumulate"
)]
fn votes_from_different_members_accumulate(world: FeedbackWorld) {
    drop(world);
}
