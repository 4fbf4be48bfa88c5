//! Contact owner reconciliation.
//!
//! Each contact is joined to the deals sharing its email; the owner of the most
//! recently created deal becomes the contact's owner when it differs.

use crate::config::SyncConfig;
use crate::models::{Contact, Deal, RunReport, UpdateDecision};
use crate::mutation::set_owner;
use crate::pagination::{PageLimits, fetch_contacts, fetch_deals};
use crate::traits::CrmApi;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Decisions produced by one pass over the contacts.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Contacts with at least one deal sharing their email.
    pub matched: usize,
    pub decisions: Vec<UpdateDecision>,
    /// Decisions actually written (zero in dry-run mode).
    pub applied: usize,
}

/// Index deals by email, keeping fetch order within each group.
/// Deals without an email never join anything.
pub fn group_by_email(deals: &[Deal]) -> HashMap<&str, Vec<&Deal>> {
    let mut groups: HashMap<&str, Vec<&Deal>> = HashMap::new();
    for deal in deals {
        if let Some(email) = deal.email.as_deref() {
            groups.entry(email).or_default().push(deal);
        }
    }
    groups
}

/// Most recently created deal of a group.
///
/// The first deal is the initial pick and only a strictly later one replaces
/// it, so equal timestamps resolve to the earliest-fetched deal. A parseable
/// timestamp always outranks an unparseable one.
pub fn latest_deal<'a>(group: &[&'a Deal]) -> Option<&'a Deal> {
    let mut iter = group.iter().copied();
    let first = iter.next()?;
    let mut latest = (first, first.created());
    for deal in iter {
        let created = deal.created();
        if is_later(created, latest.1) {
            latest = (deal, created);
        }
    }
    Some(latest.0)
}

fn is_later(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (Some(c), Some(l)) => c > l,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Decide whether `contact` needs a new owner given its join group.
pub fn plan_owner_update(contact: &Contact, group: &[&Deal]) -> Option<UpdateDecision> {
    let deal = latest_deal(group)?;
    let proposed = deal.owner_id.as_deref()?;
    if contact.owner_id.as_deref() == Some(proposed) {
        return None;
    }
    Some(UpdateDecision {
        contact_id: contact.id.clone(),
        current_owner_id: contact.owner_id.clone(),
        proposed_owner_id: proposed.to_string(),
        deal_id: deal.id.clone(),
    })
}

/// Walk contacts in fetch order and apply each owner change as it is decided.
///
/// The first failed update aborts the pass; nothing is rolled back.
#[tracing::instrument(level = "debug", skip_all, fields(contacts = contacts.len(), deals = deals.len()))]
pub async fn reconcile(
    api: &dyn CrmApi,
    contacts: &[Contact],
    deals: &[Deal],
    dry_run: bool,
) -> Result<ReconcileOutcome> {
    let groups = group_by_email(deals);
    let mut outcome = ReconcileOutcome::default();

    for contact in contacts {
        let group = contact
            .email
            .as_deref()
            .and_then(|email| groups.get(email))
            .map(Vec::as_slice)
            .unwrap_or_default();

        if group.is_empty() {
            tracing::debug!(
                contact_id = %contact.id,
                email = ?contact.email,
                "no matching deals for contact"
            );
            continue;
        }
        outcome.matched += 1;
        tracing::debug!(
            contact_id = %contact.id,
            matching_deals = group.len(),
            "found matching deals for contact"
        );

        let Some(decision) = plan_owner_update(contact, group) else {
            tracing::debug!(contact_id = %contact.id, "no owner update needed");
            continue;
        };

        tracing::info!(
            contact_id = %decision.contact_id,
            from = decision.current_owner_id.as_deref().unwrap_or("none"),
            to = %decision.proposed_owner_id,
            deal_id = %decision.deal_id,
            dry_run,
            "updating contact owner"
        );
        if !dry_run {
            set_owner(api, &decision.contact_id, &decision.proposed_owner_id).await?;
            outcome.applied += 1;
        }
        outcome.decisions.push(decision);
    }

    Ok(outcome)
}

/// A unit of work the scheduler can fire.
#[async_trait]
pub trait SyncJob: Send + Sync {
    async fn run(&self) -> Result<RunReport>;
}

/// Full reconciliation run: fetch contacts, fetch deals, reconcile.
pub struct OwnerSync {
    api: Arc<dyn CrmApi>,
    limits: PageLimits,
    dry_run: bool,
}

impl OwnerSync {
    pub fn new(api: Arc<dyn CrmApi>, cfg: &SyncConfig) -> Self {
        Self {
            api,
            limits: PageLimits {
                page_size: cfg.page_size,
                max_pages: cfg.max_pages,
            },
            dry_run: cfg.dry_run,
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[async_trait]
impl SyncJob for OwnerSync {
    #[tracing::instrument(level = "info", skip(self), fields(run_id = %Uuid::new_v4(), dry_run = self.dry_run))]
    async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();

        let contacts = fetch_contacts(self.api.as_ref(), self.limits).await?;
        tracing::info!(count = contacts.len(), "found contacts");
        let deals = fetch_deals(self.api.as_ref(), self.limits).await?;
        tracing::info!(count = deals.len(), "found deals");

        let outcome = reconcile(self.api.as_ref(), &contacts, &deals, self.dry_run).await?;

        let report = RunReport {
            contacts: contacts.len(),
            deals: deals.len(),
            matched: outcome.matched,
            updated: outcome.applied,
            dry_run: self.dry_run,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            contacts = report.contacts,
            deals = report.deals,
            matched = report.matched,
            updated = report.updated,
            planned = outcome.decisions.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "reconciliation run completed"
        );
        Ok(report)
    }
}
