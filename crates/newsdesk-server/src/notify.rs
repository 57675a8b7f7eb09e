//! Push notifications for the editorial workflow.
//!
//! The [`Notifier`] owns the dispatcher and a [`TaskTracker`]. Workflow
//! notifications run as tracked background tasks so the triggering request
//! never waits on, or fails because of, push delivery; shutdown drains them.

use std::future::Future;
use std::sync::Arc;

use newsdesk_push::templates;
use newsdesk_push::{is_deliverable, DispatchReport, Dispatcher, PushMessage};
use newsdesk_shared::models::{Article, DeviceToken, Profile, RoleRow};
use newsdesk_shared::types::{ArticleStatus, Role};
use newsdesk_store::tables::{PROFILES, ROLES, USERS_DEVICES};
use newsdesk_store::{Query, Store, StoreExt};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::error::ApiResult;

/// Device-token producers over the `users_devices` table.
pub struct DeviceDirectory<'a> {
    store: &'a dyn Store,
}

impl<'a> DeviceDirectory<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Deliverable tokens of one user's devices.
    pub async fn user_tokens(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let query = Query::table(USERS_DEVICES)
            .select("fcm_token")
            .eq("user_id", user_id);
        self.tokens(&query).await
    }

    /// Deliverable tokens of every admin's devices.
    pub async fn admin_tokens(&self) -> ApiResult<Vec<String>> {
        let roles: Vec<RoleRow> = self
            .store
            .fetch(&Query::table(ROLES).eq("name", Role::Admin.as_str()))
            .await?;
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let admins: Vec<Profile> = self
            .store
            .fetch(
                &Query::table(PROFILES)
                    .select("user_id")
                    .in_list("role_id", roles.iter().map(|r| r.id)),
            )
            .await?;
        if admins.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::table(USERS_DEVICES)
            .select("fcm_token")
            .in_list("user_id", admins.iter().map(|p| p.user_id.as_str()));
        self.tokens(&query).await
    }

    /// Deliverable tokens of every registered device, guests included.
    pub async fn all_tokens(&self) -> ApiResult<Vec<String>> {
        self.tokens(&Query::table(USERS_DEVICES).select("fcm_token"))
            .await
    }

    async fn tokens(&self, query: &Query) -> ApiResult<Vec<String>> {
        let devices: Vec<DeviceToken> = self.store.fetch(query).await?;
        Ok(devices
            .into_iter()
            .map(|d| d.fcm_token)
            .filter(|t| is_deliverable(t))
            .collect())
    }

    /// Remove the device rows of tokens that can never be delivered to.
    pub async fn remove(&self, tokens: &[String]) -> ApiResult<usize> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let removed = self
            .store
            .delete(&Query::table(USERS_DEVICES).in_list("fcm_token", tokens.iter().map(String::as_str)))
            .await?;
        Ok(removed.len())
    }
}

#[derive(Clone)]
pub struct Notifier {
    dispatcher: Dispatcher,
    store: Arc<dyn Store>,
    tracker: TaskTracker,
}

impl Notifier {
    pub fn new(dispatcher: Dispatcher, store: Arc<dyn Store>) -> Self {
        Self {
            dispatcher,
            store,
            tracker: TaskTracker::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatcher.is_enabled()
    }

    /// Dispatch `message` and prune the tokens reported invalid.
    pub async fn send(&self, message: &PushMessage, tokens: &[String]) -> DispatchReport {
        let report = self.dispatcher.dispatch(message, tokens).await;
        if !report.invalid_tokens.is_empty() {
            match DeviceDirectory::new(self.store.as_ref())
                .remove(&report.invalid_tokens)
                .await
            {
                Ok(removed) => info!(removed, "Removed invalid device tokens"),
                Err(e) => warn!(error = %e, "Failed to remove invalid device tokens"),
            }
        }
        report
    }

    /// Tell admins that an author submitted `article`.
    pub fn article_submitted(&self, article: &Article, author_name: String) {
        let message = templates::new_article_submitted(
            &author_name,
            &article.title,
            &article.id.to_string(),
        );
        self.spawn("new_article", self.clone().to_admins(message));
    }

    /// Tell the author and the admins that `article` moved to `status`.
    /// The two notifications are independent of each other.
    pub fn status_changed(&self, article: &Article, status: ArticleStatus, author_name: String) {
        let article_id = article.id.to_string();

        if let Some(author_id) = article.user_id.clone() {
            let message = templates::status_changed_for_author(status, &article.title, &article_id);
            self.spawn("status_change_author", self.clone().to_user(author_id, message));
        }

        let message =
            templates::status_changed_for_admins(status, &author_name, &article.title, &article_id);
        self.spawn("status_change_admins", self.clone().to_admins(message));
    }

    async fn to_admins(self, message: PushMessage) -> ApiResult<DispatchReport> {
        let tokens = DeviceDirectory::new(self.store.as_ref()).admin_tokens().await?;
        Ok(self.send(&message, &tokens).await)
    }

    async fn to_user(self, user_id: String, message: PushMessage) -> ApiResult<DispatchReport> {
        let tokens = DeviceDirectory::new(self.store.as_ref())
            .user_tokens(&user_id)
            .await?;
        Ok(self.send(&message, &tokens).await)
    }

    /// Run a notification on the tracker and log its outcome.
    fn spawn<F>(&self, kind: &'static str, task: F)
    where
        F: Future<Output = ApiResult<DispatchReport>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match task.await {
                Ok(report) if report.skipped => {
                    info!(kind, reason = ?report.reason, "Notification skipped");
                }
                Ok(report) if report.failure_count > 0 => {
                    warn!(
                        kind,
                        success = report.success_count,
                        failure = report.failure_count,
                        batches = report.total_batches,
                        "Notification partially failed"
                    );
                }
                Ok(report) => {
                    info!(
                        kind,
                        success = report.success_count,
                        batches = report.total_batches,
                        "Notification delivered"
                    );
                }
                Err(e) => warn!(kind, error = %e, "Notification failed"),
            }
        });
    }

    /// Wait for every notification spawned so far.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
