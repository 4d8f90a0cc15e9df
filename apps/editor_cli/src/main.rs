use std::{collections::HashMap, fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use editor_core::{
    AccountsProvider, CloseOutcome, ContactLookup, DriverNotice, EditorDriver, GroupEditor,
    MembersSource, MetadataSource, MutationRequest, SaveService, SessionSnapshot,
};
use serde::Deserialize;
use shared::{
    domain::{AccountIdentity, ContactId, GroupId, GroupMetadata, Member, PersonRef, RawMemberId},
    error::FatalSessionError,
};
use tracing::info;

/// Edits a group roster from a JSON directory fixture and prints the
/// mutation request a real save service would receive.
#[derive(Parser, Debug)]
struct Args {
    /// JSON fixture describing the group, its members, and the contact
    /// directory.
    #[arg(long)]
    fixture: PathBuf,
    /// Group id to edit. Without it a new group is created under the
    /// fixture's account.
    #[arg(long)]
    group_id: Option<i64>,
    /// New group name.
    #[arg(long)]
    rename: Option<String>,
    /// Contact ids to add, resolved through the fixture's contact rows.
    #[arg(long)]
    add: Vec<i64>,
    /// Contact ids to remove from the roster.
    #[arg(long)]
    remove: Vec<i64>,
    /// Write the session snapshot here and resume from it before
    /// committing.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    group: GroupRow,
    members: Vec<MemberRow>,
    contacts: Vec<MemberRow>,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    id: i64,
    name: String,
    account: AccountIdentity,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    raw_member_id: i64,
    contact_id: i64,
    lookup_key: String,
    display_name: String,
    #[serde(default)]
    photo: Option<String>,
}

impl MemberRow {
    fn to_member(&self) -> Member {
        Member::new(
            RawMemberId(self.raw_member_id),
            ContactId(self.contact_id),
            &self.lookup_key,
            self.display_name.clone(),
            self.photo.clone(),
        )
    }
}

struct FixtureDirectory {
    group: GroupId,
    metadata: GroupMetadata,
    members: Vec<Member>,
    contacts: HashMap<String, Member>,
}

impl FixtureDirectory {
    fn load(fixture: &Fixture) -> Self {
        Self {
            group: GroupId(fixture.group.id),
            metadata: GroupMetadata {
                name: fixture.group.name.clone(),
                account: fixture.group.account.clone(),
                read_only: fixture.group.read_only,
            },
            members: fixture.members.iter().map(MemberRow::to_member).collect(),
            contacts: fixture
                .contacts
                .iter()
                .map(|row| (row.contact_id.to_string(), row.to_member()))
                .collect(),
        }
    }

    fn contact_row<'a>(fixture: &'a Fixture, contact_id: i64) -> Option<&'a MemberRow> {
        fixture
            .contacts
            .iter()
            .find(|row| row.contact_id == contact_id)
    }
}

#[async_trait]
impl MetadataSource for FixtureDirectory {
    async fn fetch_group_metadata(&self, group: GroupId) -> Result<Option<GroupMetadata>> {
        Ok((group == self.group).then(|| self.metadata.clone()))
    }
}

#[async_trait]
impl MembersSource for FixtureDirectory {
    async fn fetch_existing_members(&self, _group: GroupId) -> Result<Vec<Member>> {
        Ok(self.members.clone())
    }
}

impl AccountsProvider for FixtureDirectory {
    fn writable_accounts(&self) -> Vec<AccountIdentity> {
        vec![self.metadata.account.clone()]
    }
}

#[async_trait]
impl ContactLookup for FixtureDirectory {
    async fn resolve_contact(
        &self,
        _raw_member_id: RawMemberId,
        person: PersonRef,
    ) -> Result<Option<Member>> {
        Ok(self.contacts.get(&person.0).cloned())
    }
}

/// Stands in for a durable save service: prints the request and echoes
/// the group id back.
struct PrintingSaveService {
    group: GroupId,
}

#[async_trait]
impl SaveService for PrintingSaveService {
    async fn submit(&self, request: MutationRequest) -> Result<GroupId> {
        println!(
            "mutation request:\n{}",
            serde_json::to_string_pretty(&request)?
        );
        Ok(self.group)
    }
}

struct AllMembershipEditable;

impl editor_core::AccountCapabilities for AllMembershipEditable {
    fn is_membership_editable(&self, _account: &AccountIdentity) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let raw = fs::read_to_string(&args.fixture)
        .with_context(|| format!("failed to read fixture '{}'", args.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse fixture '{}'", args.fixture.display()))?;
    let directory = Arc::new(FixtureDirectory::load(&fixture));

    let editor = match args.group_id {
        Some(id) => GroupEditor::edit(GroupId(id)),
        None => GroupEditor::create(None, &directory.writable_accounts()),
    };
    let (mut driver, mut save_outcomes) = EditorDriver::new(
        editor,
        directory.clone(),
        directory.clone(),
        directory.clone(),
        Arc::new(PrintingSaveService {
            group: GroupId(args.group_id.unwrap_or(fixture.group.id + 1)),
        }),
        Arc::new(AllMembershipEditable),
    );

    for notice in driver.pump().await {
        match notice {
            DriverNotice::Closed(CloseOutcome::GroupNotFound) => {
                let id = args.group_id.unwrap_or_default();
                return Err(FatalSessionError::GroupNotFound(id).into());
            }
            DriverNotice::Closed(CloseOutcome::AccountsNotFound) => {
                return Err(FatalSessionError::NoWritableAccounts.into());
            }
            _ => {}
        }
    }

    if let Some(name) = &args.rename {
        driver.editor_mut().set_name(name.clone());
    }
    for contact_id in &args.add {
        let row = FixtureDirectory::contact_row(&fixture, *contact_id)
            .with_context(|| format!("no contact {contact_id} in the fixture"))?;
        driver
            .editor_mut()
            .pick_suggestion(RawMemberId(row.raw_member_id), PersonRef(contact_id.to_string()));
        driver.pump().await;
    }
    for contact_id in &args.remove {
        let Some(member) = driver
            .editor()
            .display()
            .iter()
            .find(|m| m.contact_id.0 == *contact_id)
            .cloned()
        else {
            bail!("contact {contact_id} is not on the roster");
        };
        driver.editor_mut().remove_member(&member);
    }

    println!("roster before commit:");
    for member in driver.editor().display() {
        println!("  {} (contact {})", member.display_name, member.contact_id.0);
    }

    if let Some(path) = &args.snapshot {
        let snapshot = driver.editor().snapshot();
        fs::write(path, snapshot.to_json()?)
            .with_context(|| format!("failed to write snapshot '{}'", path.display()))?;
        info!(path = %path.display(), "session snapshot written; resuming from it");
        let restored = SessionSnapshot::from_json(&fs::read_to_string(path)?)?;
        *driver.editor_mut() = GroupEditor::resume(restored);
        driver.pump().await;
    }

    let notices = driver.done_clicked().await.context("commit failed")?;
    for notice in notices {
        match notice {
            DriverNotice::Closed(CloseOutcome::SaveDispatched) => {
                let outcome = save_outcomes
                    .recv()
                    .await
                    .context("save outcome channel closed")?;
                match outcome.result {
                    Ok(group) => println!("saved group {}", group.0),
                    Err(reason) => bail!("save failed: {reason}"),
                }
            }
            DriverNotice::Closed(CloseOutcome::SavedNoChanges { group }) => {
                println!(
                    "nothing to save; group {} unchanged",
                    group.map_or_else(|| "<new>".to_string(), |g| g.0.to_string())
                );
            }
            DriverNotice::Closed(outcome) => println!("editor closed: {outcome:?}"),
            other => println!("unexpected notice: {other:?}"),
        }
    }

    Ok(())
}
