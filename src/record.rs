//! A single addressable JSON:API resource.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use event_emitter_rs::EventEmitter;
use parking_lot::{Mutex, RwLock};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::document::{
    Document, Identifier, PrimaryData, Relationship, RelationshipData, Resource,
};
use crate::error::StoreError;
use crate::observable::ObservableMap;
use crate::owner::Owner;
use crate::transport::{Response, Transport};
use crate::unique_id::unique_id;

// encodeURIComponent-style set for the trailing id path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Hook invoked with the `included` member of an ingested document. The
/// default is a no-op; applications install one to route included resources
/// into sibling stores.
pub type IncludedHook = Box<dyn Fn(&[Resource]) + Send + Sync>;

/// Either a full document or a bare resource object, for [`Record::set`].
pub enum Payload {
    Document(Document),
    Resource(Resource),
}

impl From<Document> for Payload {
    fn from(document: Document) -> Self {
        Payload::Document(document)
    }
}

impl From<Resource> for Payload {
    fn from(resource: Resource) -> Self {
        Payload::Resource(resource)
    }
}

/// Options for [`Record::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Request URL override. Defaults to the record's own URL.
    pub url: Option<String>,
    /// Query parameters.
    pub params: Vec<(String, String)>,
}

/// Options for [`Record::save`] and [`Record::destroy`].
///
/// With `wait: false` (the default) mutations are applied optimistically
/// before the request resolves and reverted on failure. With `wait: true`
/// nothing is mutated until the backend confirms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    pub wait: bool,
}

/// Options for [`Record::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub wait: bool,
    /// POST target override. Defaults to the record's own URL; a record set
    /// passes its collection URL here.
    pub url: Option<String>,
}

/// A partial update: `attributes` and `relationships` are independently
/// optional, and absent members are left untouched on the record and omitted
/// from the outgoing body.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    pub attributes: Option<BTreeMap<String, Value>>,
    pub relationships: Option<BTreeMap<String, Relationship>>,
}

impl Patch {
    pub fn attributes(attributes: BTreeMap<String, Value>) -> Self {
        Patch {
            attributes: Some(attributes),
            relationships: None,
        }
    }

    pub fn relationships(relationships: BTreeMap<String, Relationship>) -> Self {
        Patch {
            attributes: None,
            relationships: Some(relationships),
        }
    }
}

#[derive(Clone, Copy)]
enum Label {
    Fetching,
    Saving,
    Deleting,
}

impl Label {
    fn as_str(self) -> &'static str {
        match self {
            Label::Fetching => "fetching",
            Label::Saving => "saving",
            Label::Deleting => "deleting",
        }
    }
}

/// A single addressable resource: attributes, relationship reference
/// descriptors, request-state flags, and CRUD operations against its own URL.
///
/// Identity is the server id once one exists, and a process-unique local key
/// before that. The id is adopted from the first payload that carries one and
/// never changes afterwards.
///
/// All network operations are non-blocking and unserialized: two overlapping
/// requests against the same record are allowed, and whichever response
/// arrives last wins for the flags and data it touches. This is a known race,
/// not something this layer coordinates.
pub struct Record {
    self_ref: Weak<Record>,
    id: RwLock<Option<String>>,
    local_key: String,
    kind: String,
    url_root: RwLock<Option<String>>,
    attributes: ObservableMap<Value>,
    relationships: ObservableMap<Relationship>,
    owner: RwLock<Option<Weak<dyn Owner>>>,
    fetching: AtomicBool,
    saving: AtomicBool,
    deleting: AtomicBool,
    included_hook: RwLock<Option<IncludedHook>>,
    emitter: Mutex<EventEmitter>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("kind", &self.kind)
            .field("id", &*self.id.read())
            .field("local_key", &self.local_key)
            .finish_non_exhaustive()
    }
}

impl Record {
    /// A fresh, unpersisted record of the given resource type.
    pub fn new(kind: impl Into<String>, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Record {
            self_ref: weak.clone(),
            id: RwLock::new(None),
            local_key: unique_id(),
            kind: kind.into(),
            url_root: RwLock::new(None),
            attributes: ObservableMap::new(),
            relationships: ObservableMap::new(),
            owner: RwLock::new(None),
            fetching: AtomicBool::new(true),
            saving: AtomicBool::new(false),
            deleting: AtomicBool::new(false),
            included_hook: RwLock::new(None),
            emitter: Mutex::new(EventEmitter::new()),
            transport,
        })
    }

    /// A record seeded from an initial resource payload.
    pub fn with_resource(
        kind: impl Into<String>,
        transport: Arc<dyn Transport>,
        resource: Resource,
    ) -> Arc<Self> {
        let record = Self::new(kind, transport);
        record.set(resource);
        record
    }

    // --- identity & addressing ---

    /// The server-assigned id, if any.
    pub fn id(&self) -> Option<String> {
        self.id.read().clone()
    }

    /// The process-unique token assigned at construction.
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// The server id if present, the local key otherwise. Always non-empty,
    /// stable once the id has been adopted.
    pub fn unique_id(&self) -> String {
        self.id().unwrap_or_else(|| self.local_key.clone())
    }

    /// True until the server has assigned an id.
    pub fn is_new(&self) -> bool {
        self.id.read().is_none()
    }

    /// The JSON:API resource type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Pin this record to an explicit base URL instead of deriving one from
    /// its owner.
    pub fn set_url_root(&self, url: impl Into<String>) {
        *self.url_root.write() = Some(url.into());
    }

    /// The record URL: the explicit URL root if set, else the owner's
    /// collection URL. Persisted records get their percent-encoded id
    /// appended as the last path segment.
    pub fn url(&self) -> Result<String, StoreError> {
        let base = match self.url_root.read().clone() {
            Some(root) => root,
            None => self
                .owner()
                .and_then(|weak| weak.upgrade())
                .and_then(|owner| owner.collection_url())
                .ok_or(StoreError::Configuration(
                    "a url root or an owner with a collection url must be specified",
                ))?,
        };

        match self.id() {
            None => Ok(base),
            Some(id) => {
                let encoded = utf8_percent_encode(&id, SEGMENT);
                if base.ends_with('/') {
                    Ok(format!("{}{}", base, encoded))
                } else {
                    Ok(format!("{}/{}", base, encoded))
                }
            }
        }
    }

    // --- ownership ---

    /// The holder this record reports lifecycle changes to, if any. The
    /// handle is non-owning and survives detachment so that a failed
    /// optimistic destroy can re-attach.
    pub fn owner(&self) -> Option<Weak<dyn Owner>> {
        self.owner.read().clone()
    }

    pub fn set_owner(&self, owner: Weak<dyn Owner>) {
        *self.owner.write() = Some(owner);
    }

    fn attach_to_owner(&self) {
        if let (Some(owner), Some(this)) = (
            self.owner().and_then(|weak| weak.upgrade()),
            self.self_ref.upgrade(),
        ) {
            owner.attach(&this);
        }
    }

    fn detach_from_owner(&self) {
        if let (Some(owner), Some(this)) = (
            self.owner().and_then(|weak| weak.upgrade()),
            self.self_ref.upgrade(),
        ) {
            owner.detach(&this);
        }
    }

    // --- observable state ---

    pub fn get_attribute(&self, key: &str) -> Option<Value> {
        self.attributes.get(key)
    }

    pub fn get_relationship(&self, name: &str) -> Option<Relationship> {
        self.relationships.get(name)
    }

    /// The attribute map, for snapshots and change subscriptions.
    pub fn attributes(&self) -> &ObservableMap<Value> {
        &self.attributes
    }

    /// The relationship map, for snapshots and change subscriptions.
    pub fn relationships(&self) -> &ObservableMap<Relationship> {
        &self.relationships
    }

    pub fn fetching(&self) -> bool {
        self.fetching.load(Ordering::SeqCst)
    }

    pub fn saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    pub fn deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst)
    }

    /// Subscribe to request-state flag changes. Event names are `fetching`,
    /// `saving` and `deleting`; the payload is `"true"` or `"false"`.
    pub fn on<F>(&self, event: &str, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.lock().on(event, listener)
    }

    fn set_label(&self, label: Label, state: bool) {
        let flag = match label {
            Label::Fetching => &self.fetching,
            Label::Saving => &self.saving,
            Label::Deleting => &self.deleting,
        };
        flag.store(state, Ordering::SeqCst);
        self.emitter.lock().emit(label.as_str(), state.to_string());
    }

    // --- mutators (no network) ---

    /// Additive-merge attributes in.
    pub fn set_attributes(&self, attributes: BTreeMap<String, Value>) {
        self.attributes.merge(attributes);
    }

    /// Merge a single attribute in.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn clear_attributes(&self) {
        self.attributes.clear();
    }

    /// Additive-merge relationship descriptors in.
    pub fn set_relationships(&self, relationships: BTreeMap<String, Relationship>) {
        self.relationships.merge(relationships);
    }

    pub fn clear_relationships(&self) {
        self.relationships.clear();
    }

    /// Create or overwrite the to-one relationship at `name`. A no-op when
    /// the existing relationship there is to-many. When `kind` is omitted the
    /// existing descriptor's type is reused.
    pub fn set_to_one_relationship(
        &self,
        name: &str,
        id: impl Into<String>,
        kind: Option<&str>,
    ) {
        let existing = self.relationships.get(name);
        if existing.as_ref().map(Relationship::is_to_many).unwrap_or(false) {
            return;
        }

        let kind = kind
            .map(str::to_string)
            .or_else(|| match &existing {
                Some(Relationship {
                    data: Some(RelationshipData::ToOne(identifier)),
                }) => Some(identifier.kind.clone()),
                _ => None,
            })
            .unwrap_or_default();

        self.relationships.insert(
            name.to_string(),
            Relationship {
                data: Some(RelationshipData::ToOne(Identifier::new(kind, id))),
            },
        );
    }

    // --- payload ingestion ---

    /// Ingest a payload, either a full document or a bare resource object.
    ///
    /// Adopts the payload's id when the record is still new, additively
    /// merges attributes and relationships, and forwards any `included`
    /// resources to the installed hook.
    pub fn set(&self, payload: impl Into<Payload>) {
        match payload.into() {
            Payload::Document(document) => {
                match document.data {
                    Some(PrimaryData::One(resource)) => self.apply_resource(resource),
                    Some(PrimaryData::Many(_)) => {
                        tracing::warn!(
                            kind = %self.kind,
                            "ignoring batch primary data on a single record"
                        );
                    }
                    None => {}
                }
                if !document.included.is_empty() {
                    self.run_included_hook(&document.included);
                }
            }
            Payload::Resource(resource) => self.apply_resource(resource),
        }
    }

    fn apply_resource(&self, resource: Resource) {
        if self.is_new() {
            if let Some(id) = resource.id {
                *self.id.write() = Some(id);
            }
        }
        if let Some(attributes) = resource.attributes {
            self.attributes.merge(attributes);
        }
        if let Some(relationships) = resource.relationships {
            self.relationships.merge(relationships);
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

    // --- network state machines ---

    /// GET the record from the backend and ingest the response.
    pub async fn fetch(&self, options: FetchOptions) -> Result<Response, StoreError> {
        self.set_label(Label::Fetching, true);

        let url = match options.url {
            Some(url) => Ok(url),
            None => self.url(),
        };
        let url = match url {
            Ok(url) => url,
            Err(err) => {
                self.set_label(Label::Fetching, false);
                return Err(err);
            }
        };

        tracing::debug!(url = %url, kind = %self.kind, "fetching record");
        match self.transport.get(&url, &options.params).await {
            Ok(response) => {
                self.set(response.document.clone());
                self.set_label(Label::Fetching, false);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "record fetch failed");
                self.set_label(Label::Fetching, false);
                Err(err)
            }
        }
    }

    /// PATCH the record to the backend. New records are routed through
    /// [`create`](Record::create) instead.
    ///
    /// With no patch the full current attributes and relationships are sent;
    /// with a patch only the members it carries are sent. Optimistic mode
    /// applies the patch immediately and rolls back to the pre-call snapshot
    /// on failure.
    pub async fn save(
        &self,
        patch: Option<Patch>,
        options: SaveOptions,
    ) -> Result<Response, StoreError> {
        if self.is_new() {
            return self
                .create(
                    patch,
                    CreateOptions {
                        wait: options.wait,
                        url: None,
                    },
                )
                .await;
        }

        let prior_attributes = self.attributes.snapshot();
        let prior_relationships = self.relationships.snapshot();

        let mut resource = Resource {
            id: self.id(),
            kind: self.kind.clone(),
            attributes: None,
            relationships: None,
        };
        match &patch {
            None => {
                resource.attributes = Some(prior_attributes.clone());
                resource.relationships = Some(prior_relationships.clone());
            }
            Some(patch) => {
                resource.attributes = patch.attributes.clone();
                resource.relationships = patch.relationships.clone();
            }
        }

        let url = self.url()?;

        if options.wait {
            self.set_label(Label::Saving, true);
        } else if let Some(patch) = &patch {
            if let Some(attributes) = &patch.attributes {
                self.attributes.merge(attributes.clone());
            }
            if let Some(relationships) = &patch.relationships {
                self.relationships.merge(relationships.clone());
            }
        }

        tracing::debug!(url = %url, kind = %self.kind, "saving record");
        match self
            .transport
            .patch(&url, &Document::from_resource(resource))
            .await
        {
            Ok(response) => {
                self.set(response.document.clone());
                self.set_label(Label::Saving, false);
                Ok(response)
            }
            Err(err) => {
                if !options.wait {
                    self.attributes.replace(prior_attributes);
                    self.relationships.replace(prior_relationships);
                }
                self.set_label(Label::Saving, false);
                tracing::warn!(url = %url, error = %err, "record save failed");
                Err(err)
            }
        }
    }

    /// Save with bare attributes, without wrapping them in a [`Patch`].
    pub async fn save_attributes(
        &self,
        attributes: BTreeMap<String, Value>,
        options: SaveOptions,
    ) -> Result<Response, StoreError> {
        self.save(Some(Patch::attributes(attributes)), options).await
    }

    /// POST the record to the backend. The outgoing body carries the current
    /// attributes and relationships merged with the patch (patch wins on key
    /// collision) and no id. The server-assigned id is adopted from the
    /// response.
    pub async fn create(
        &self,
        patch: Option<Patch>,
        options: CreateOptions,
    ) -> Result<Response, StoreError> {
        let prior_attributes = self.attributes.snapshot();
        let prior_relationships = self.relationships.snapshot();

        let mut outgoing_attributes = prior_attributes.clone();
        let mut outgoing_relationships = prior_relationships.clone();
        if let Some(patch) = &patch {
            if let Some(attributes) = &patch.attributes {
                outgoing_attributes.extend(attributes.clone());
            }
            if let Some(relationships) = &patch.relationships {
                outgoing_relationships.extend(relationships.clone());
            }
        }
        let resource = Resource {
            id: None,
            kind: self.kind.clone(),
            attributes: Some(outgoing_attributes),
            relationships: Some(outgoing_relationships),
        };

        let url = match options.url {
            Some(url) => url,
            None => self.url()?,
        };

        if options.wait {
            self.set_label(Label::Saving, true);
        } else if let Some(patch) = &patch {
            if let Some(attributes) = &patch.attributes {
                self.attributes.merge(attributes.clone());
            }
            if let Some(relationships) = &patch.relationships {
                self.relationships.merge(relationships.clone());
            }
        }

        tracing::debug!(url = %url, kind = %self.kind, "creating record");
        match self
            .transport
            .post(&url, &Document::from_resource(resource))
            .await
        {
            Ok(response) => {
                self.set(response.document.clone());
                self.set_label(Label::Saving, false);
                Ok(response)
            }
            Err(err) => {
                if !options.wait {
                    self.attributes.replace(prior_attributes);
                    self.relationships.replace(prior_relationships);
                }
                self.set_label(Label::Saving, false);
                tracing::warn!(url = %url, error = %err, "record create failed");
                Err(err)
            }
        }
    }

    /// DELETE the record from the backend and detach it from its owner.
    ///
    /// A never-persisted record detaches synchronously and issues no network
    /// call; `Ok(None)` marks that path. Optimistic mode detaches before the
    /// request and re-attaches if it fails.
    pub async fn destroy(&self, options: SaveOptions) -> Result<Option<Response>, StoreError> {
        if self.is_new() {
            self.detach_from_owner();
            return Ok(None);
        }

        let url = self.url()?;

        if options.wait {
            self.set_label(Label::Deleting, true);
        } else {
            self.detach_from_owner();
        }

        tracing::debug!(url = %url, kind = %self.kind, "destroying record");
        match self.transport.delete(&url).await {
            Ok(response) => {
                if options.wait {
                    self.detach_from_owner();
                }
                self.set_label(Label::Deleting, false);
                Ok(Some(response))
            }
            Err(err) => {
                if !options.wait {
                    self.attach_to_owner();
                }
                self.set_label(Label::Deleting, false);
                tracing::warn!(url = %url, error = %err, "record destroy failed");
                Err(err)
            }
        }
    }
}
