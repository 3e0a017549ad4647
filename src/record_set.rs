//! An ordered, unique-by-id collection of records.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use event_emitter_rs::EventEmitter;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::document::{Document, PrimaryData, Resource};
use crate::error::StoreError;
use crate::observable::{ObservableList, ObservableMap};
use crate::owner::Owner;
use crate::record::{CreateOptions, FetchOptions, IncludedHook, Record, SaveOptions};
use crate::transport::{Response, Transport};

/// Builds the member records a set instantiates. Injected at construction so
/// a set can produce application-specific records (custom URL roots,
/// included hooks, ...) without subclassing.
pub type RecordFactory = Box<dyn Fn(Arc<dyn Transport>) -> Arc<Record> + Send + Sync>;

/// Reconciliation switches for [`RecordSet::set_records`]. All three default
/// to `true`.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Add incoming items that match no current member.
    pub add: bool,
    /// Merge incoming items into the member they match, in place.
    pub merge: bool,
    /// Prune members that match no incoming item.
    pub remove: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        SetOptions {
            add: true,
            merge: true,
            remove: true,
        }
    }
}

impl SetOptions {
    /// The pure-insertion configuration used by [`RecordSet::add`].
    pub fn add_only() -> Self {
        SetOptions {
            add: true,
            merge: false,
            remove: false,
        }
    }
}

/// Construction-time knobs for [`RecordSet`].
#[derive(Default)]
pub struct RecordSetOptions {
    /// Collection URL. Defaults to `/`.
    pub url: Option<String>,
    /// Member record factory. Defaults to bare [`Record`]s of the set's
    /// resource type.
    pub factory: Option<RecordFactory>,
}

/// Something a set can ingest as a member: an existing record instance or a
/// bare resource object to instantiate.
pub enum RecordInput {
    Instance(Arc<Record>),
    Resource(Resource),
}

impl From<Arc<Record>> for RecordInput {
    fn from(record: Arc<Record>) -> Self {
        RecordInput::Instance(record)
    }
}

impl From<Resource> for RecordInput {
    fn from(resource: Resource) -> Self {
        RecordInput::Resource(resource)
    }
}

/// Something a set can remove: a held record instance or a raw id.
pub enum RemoveInput {
    Instance(Arc<Record>),
    Id(String),
}

impl From<Arc<Record>> for RemoveInput {
    fn from(record: Arc<Record>) -> Self {
        RemoveInput::Instance(record)
    }
}

impl From<String> for RemoveInput {
    fn from(id: String) -> Self {
        RemoveInput::Id(id)
    }
}

impl From<&str> for RemoveInput {
    fn from(id: &str) -> Self {
        RemoveInput::Id(id.to_string())
    }
}

/// An ordered sequence of records, unique by
/// [`unique_id`](Record::unique_id), with pagination metadata, request-state
/// flags, and batch reconciliation against incoming JSON:API documents.
///
/// Like records, sets do not serialize overlapping requests: the last
/// response to arrive wins for whatever flags and members it touches.
pub struct RecordSet {
    self_ref: Weak<RecordSet>,
    kind: String,
    url: String,
    meta: ObservableMap<Value>,
    links: ObservableMap<Value>,
    models: ObservableList<Arc<Record>>,
    fetching: AtomicBool,
    saving: AtomicBool,
    factory: RecordFactory,
    included_hook: RwLock<Option<IncludedHook>>,
    emitter: Mutex<EventEmitter>,
    transport: Arc<dyn Transport>,
}

impl RecordSet {
    /// An empty set for the given resource type, rooted at `/`.
    pub fn new(kind: impl Into<String>, transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_options(kind, transport, RecordSetOptions::default())
    }

    /// An empty set rooted at the given collection URL.
    pub fn with_url(
        kind: impl Into<String>,
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Self::with_options(
            kind,
            transport,
            RecordSetOptions {
                url: Some(url.into()),
                factory: None,
            },
        )
    }

    pub fn with_options(
        kind: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: RecordSetOptions,
    ) -> Arc<Self> {
        let kind = kind.into();
        let factory = options.factory.unwrap_or_else(|| {
            let kind = kind.clone();
            Box::new(move |transport: Arc<dyn Transport>| Record::new(kind.clone(), transport))
        });

        Arc::new_cyclic(|weak| RecordSet {
            self_ref: weak.clone(),
            kind,
            url: options.url.unwrap_or_else(|| "/".to_string()),
            meta: ObservableMap::new(),
            links: ObservableMap::new(),
            models: ObservableList::new(),
            fetching: AtomicBool::new(false),
            saving: AtomicBool::new(false),
            factory,
            included_hook: RwLock::new(None),
            emitter: Mutex::new(EventEmitter::new()),
            transport,
        })
    }

    // --- addressing & typing ---

    /// The collection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The resource type this set holds.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    fn as_owner(&self) -> Weak<dyn Owner> {
        let weak: Weak<dyn Owner> = self.self_ref.clone();
        weak
    }

    // --- lookup ---

    /// Ordered unique ids of all current members.
    pub fn record_ids(&self) -> Vec<String> {
        self.models
            .snapshot()
            .iter()
            .map(|record| record.unique_id())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Positional access. `None` when out of range.
    pub fn get_at(&self, index: usize) -> Option<Arc<Record>> {
        self.models.get(index)
    }

    /// First member whose unique id matches.
    pub fn get(&self, unique_id: &str) -> Option<Arc<Record>> {
        self.models.find(|record| record.unique_id() == unique_id)
    }

    /// A point-in-time copy of the member sequence.
    pub fn records(&self) -> Vec<Arc<Record>> {
        self.models.snapshot()
    }

    /// The member list, for change subscriptions.
    pub fn models(&self) -> &ObservableList<Arc<Record>> {
        &self.models
    }

    pub fn get_meta(&self, key: &str) -> Option<Value> {
        self.meta.get(key)
    }

    pub fn get_link(&self, key: &str) -> Option<Value> {
        self.links.get(key)
    }

    pub fn fetching(&self) -> bool {
        self.fetching.load(Ordering::SeqCst)
    }

    pub fn saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Subscribe to request-state flag changes. Event names are `fetching`
    /// and `saving`; the payload is `"true"` or `"false"`.
    pub fn on<F>(&self, event: &str, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.lock().on(event, listener)
    }

    fn set_label(&self, label: &'static str, state: bool) {
        let flag = match label {
            "fetching" => &self.fetching,
            _ => &self.saving,
        };
        flag.store(state, Ordering::SeqCst);
        self.emitter.lock().emit(label, state.to_string());
    }

    // --- document ingestion ---

    /// Additive-merge pagination metadata in.
    pub fn set_meta(&self, meta: impl IntoIterator<Item = (String, Value)>) {
        self.meta.merge(meta);
    }

    /// Additive-merge pagination links in.
    pub fn set_links(&self, links: impl IntoIterator<Item = (String, Value)>) {
        self.links.merge(links);
    }

    /// Ingest a full document: merges `meta` and `links`, reconciles the
    /// member sequence against `data`, and forwards `included` resources to
    /// the installed hook.
    pub fn set(&self, document: Document, options: SetOptions) {
        if !document.meta.is_empty() {
            self.set_meta(document.meta);
        }
        if !document.links.is_empty() {
            self.set_links(document.links);
        }
        match document.data {
            Some(PrimaryData::Many(resources)) => self.set_records(resources, options),
            Some(PrimaryData::One(resource)) => self.set_records(vec![resource], options),
            None => {}
        }
        if !document.included.is_empty() {
            self.run_included_hook(&document.included);
        }
    }

    /// Install the hook that receives `included` resources from ingested
    /// documents.
    pub fn on_included<F>(&self, hook: F)
    where
        F: Fn(&[Resource]) + Send + Sync + 'static,
    {
        *self.included_hook.write() = Some(Box::new(hook));
    }

    fn run_included_hook(&self, included: &[Resource]) {
        if let Some(hook) = &*self.included_hook.read() {
            hook(included);
        }
    }

    // --- reconciliation ---

    /// Converge the member sequence onto an incoming item batch.
    ///
    /// With `remove`, members whose unique id matches no incoming item id are
    /// pruned first (this includes never-persisted members, whose local keys
    /// cannot appear in the incoming batch). Then each item, in input order,
    /// either merges into the member carrying its id (`merge`) or is
    /// instantiated as a new member (`add`). An item without an id never
    /// matches an existing member and is always treated as new.
    pub fn set_records(&self, items: Vec<Resource>, options: SetOptions) {
        if options.remove {
            let incoming: HashSet<&str> = items
                .iter()
                .filter_map(|item| item.id.as_deref())
                .collect();
            let stale: Vec<String> = self
                .record_ids()
                .into_iter()
                .filter(|id| !incoming.contains(id.as_str()))
                .collect();
            self.remove_records(&stale);
        }

        for item in items {
            let existing = item.id.as_deref().and_then(|id| self.get(id));
            match existing {
                Some(record) => {
                    if options.merge {
                        record.set(item);
                    }
                }
                None => {
                    if options.add {
                        // Factory-built members always carry this set's type.
                        let _ = self.add_records(vec![item.into()]);
                    }
                }
            }
        }
    }

    /// Attach records to the set, appending in input order, and return the
    /// attached instances.
    ///
    /// Existing instances must carry this set's resource type; a mismatch
    /// fails with [`StoreError::TypeMismatch`] and leaves the sequence
    /// untouched. Bare resources are instantiated through the set's factory
    /// with this set as owner.
    pub fn add_records(
        &self,
        inputs: impl IntoIterator<Item = RecordInput>,
    ) -> Result<Vec<Arc<Record>>, StoreError> {
        let mut attached = Vec::new();
        for input in inputs {
            let record = match input {
                RecordInput::Instance(record) => {
                    if record.kind() != self.kind {
                        return Err(StoreError::TypeMismatch {
                            expected: self.kind.clone(),
                            actual: record.kind().to_string(),
                        });
                    }
                    if record.owner().is_none() {
                        record.set_owner(self.as_owner());
                    }
                    record
                }
                RecordInput::Resource(resource) => {
                    let record = (self.factory)(self.transport.clone());
                    record.set_owner(self.as_owner());
                    record.set(resource);
                    record
                }
            };
            attached.push(record);
        }

        self.models.extend(attached.iter().cloned());
        Ok(attached)
    }

    /// Pure insertion: attach the inputs that match no current member,
    /// skipping the rest. Merge and removal are bypassed entirely.
    pub fn add(
        &self,
        inputs: impl IntoIterator<Item = RecordInput>,
    ) -> Result<Vec<Arc<Record>>, StoreError> {
        let fresh: Vec<RecordInput> = inputs
            .into_iter()
            .filter(|input| {
                let held = match input {
                    RecordInput::Instance(record) => self.get(&record.unique_id()).is_some(),
                    RecordInput::Resource(resource) => resource
                        .id
                        .as_deref()
                        .map(|id| self.get(id).is_some())
                        .unwrap_or(false),
                };
                !held
            })
            .collect();
        self.add_records(fresh)
    }

    /// [`add`](RecordSet::add) for a single input.
    pub fn add_one(&self, input: impl Into<RecordInput>) -> Result<Option<Arc<Record>>, StoreError> {
        Ok(self.add([input.into()])?.into_iter().next())
    }

    /// Remove the members matching the given inputs. Instances are matched
    /// by unique id, raw ids as-is.
    pub fn remove(&self, inputs: impl IntoIterator<Item = RemoveInput>) {
        let ids: Vec<String> = inputs
            .into_iter()
            .map(|input| match input {
                RemoveInput::Instance(record) => record.unique_id(),
                RemoveInput::Id(id) => id,
            })
            .collect();
        self.remove_records(&ids);
    }

    /// Splice out the member carrying each id, in place. Ids with no match
    /// are silently skipped; remaining members keep their order.
    pub fn remove_records(&self, ids: &[String]) {
        for id in ids {
            self.models
                .remove_first(|record| record.unique_id() == *id);
        }
    }

    // --- network state machines ---

    /// GET the collection and reconcile the members against the response,
    /// honoring the reconciliation switches.
    pub async fn fetch(
        &self,
        options: FetchOptions,
        reconcile: SetOptions,
    ) -> Result<Response, StoreError> {
        self.set_label("fetching", true);

        let url = options.url.unwrap_or_else(|| self.url.clone());

        tracing::debug!(url = %url, kind = %self.kind, "fetching record set");
        match self.transport.get(&url, &options.params).await {
            Ok(response) => {
                self.set(response.document.clone(), reconcile);
                self.set_label("fetching", false);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "record set fetch failed");
                self.set_label("fetching", false);
                Err(err)
            }
        }
    }

    /// Instantiate a record from `data` and persist it through the record's
    /// own create, POSTed to this set's collection URL.
    ///
    /// Refuses to duplicate: `Ok(None)` when `data` carries an id already
    /// held by a member. Optimistic mode attaches the record before the
    /// request resolves and removes it again on failure; `wait` mode attaches
    /// only after the backend confirms.
    pub async fn create(
        &self,
        data: Resource,
        options: SaveOptions,
    ) -> Result<Option<Arc<Record>>, StoreError> {
        if let Some(id) = data.id.as_deref() {
            if self.get(id).is_some() {
                return Ok(None);
            }
        }

        let record = (self.factory)(self.transport.clone());
        record.set_owner(self.as_owner());
        record.set(data);

        if options.wait {
            self.set_label("saving", true);
        } else {
            self.add_records(vec![record.clone().into()])?;
        }

        let outcome = record
            .create(
                None,
                CreateOptions {
                    wait: false,
                    url: Some(self.url.clone()),
                },
            )
            .await;

        match outcome {
            Ok(_) => {
                let attached = if options.wait {
                    self.add_records(vec![record.clone().into()])
                } else {
                    Ok(Vec::new())
                };
                self.set_label("saving", false);
                attached?;
                Ok(Some(record))
            }
            Err(err) => {
                self.set_label("saving", false);
                // Undo the optimistic attach; a no-op when nothing was added.
                self.remove([RemoveInput::Instance(record)]);
                Err(err)
            }
        }
    }
}

impl Owner for RecordSet {
    fn collection_url(&self) -> Option<String> {
        Some(self.url.clone())
    }

    fn attach(&self, record: &Arc<Record>) {
        if let Err(err) = self.add([RecordInput::Instance(record.clone())]) {
            tracing::warn!(error = %err, "could not re-attach record to set");
        }
    }

    fn detach(&self, record: &Arc<Record>) {
        self.remove_records(&[record.unique_id()]);
    }
}
