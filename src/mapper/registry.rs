use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::PariahError;
use crate::mapper::{Mapper, MapperClass, MapperOptions, TableMapper};
use crate::model::{Entity, EntityKind};
use crate::settings::{ConfigMap, Mapping};
use crate::storage::RowStore;

/// Component trees deeper than this are treated as malformed.
const MAX_DEPTH: usize = 10;

type Slot = Arc<Mutex<Option<Arc<dyn Mapper>>>>;

/// Resolves entity kinds to shared mapper instances.
///
/// Built once at startup and passed by reference to whatever needs
/// mappers. The first request for a kind constructs its mapper under that
/// kind's slot lock; concurrent callers for the same kind wait on the slot
/// and then read the published instance. Other kinds are not blocked.
pub struct MapperRegistry {
    store: Arc<dyn RowStore>,
    mapping: Mapping,
    slots: Mutex<HashMap<EntityKind, Slot>>,
    constructed: AtomicUsize,
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mapping", &self.mapping)
            .field("constructed", &self.constructed())
            .finish()
    }
}

impl MapperRegistry {
    pub fn new(store: Arc<dyn RowStore>, mapping: Mapping) -> Self {
        Self {
            store,
            mapping,
            slots: Mutex::new(HashMap::new()),
            constructed: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Number of mappers this registry has constructed and cached.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// The configured mapper for `kind`, constructed on first use.
    pub fn get_mapper(&self, kind: EntityKind) -> Result<Arc<dyn Mapper>, PariahError> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(kind).or_default().clone()
        };

        let mut published = slot.lock();
        if let Some(mapper) = published.as_ref() {
            return Ok(mapper.clone());
        }

        // A failed construction leaves the slot empty so a later call retries.
        let mapper = self.construct(kind)?;
        *published = Some(mapper.clone());
        Ok(mapper)
    }

    pub fn get_mapper_by_name(&self, type_name: &str) -> Result<Arc<dyn Mapper>, PariahError> {
        self.get_mapper(type_name.parse()?)
    }

    /// Mapper used to load components of `kind`.
    ///
    /// Configured kinds resolve through [`get_mapper`](Self::get_mapper).
    /// Unconfigured kinds get an uncached mapper of the class picked by
    /// [`MapperClass::infer`], using that class's defaults.
    pub fn component_mapper(&self, kind: EntityKind) -> Result<Arc<dyn Mapper>, PariahError> {
        if self.mapping.model(kind.name()).is_some() {
            return self.get_mapper(kind);
        }

        let class = MapperClass::infer(kind);
        let defaults = self
            .mapping
            .mapper_defaults(class.name())
            .cloned()
            .unwrap_or_default();
        let options = MapperOptions::from_config(kind, &defaults)?;
        tracing::debug!(%kind, %class, table = %options.table, "Inferred component mapper");
        Ok(Arc::new(TableMapper::new(
            kind,
            class,
            options,
            self.store.clone(),
        )?))
    }

    /// Load every component level below `entity`.
    pub fn hydrate(&self, entity: &mut Entity) -> Result<(), PariahError> {
        self.hydrate_at(entity, 0)
    }

    fn hydrate_at(&self, entity: &mut Entity, depth: usize) -> Result<(), PariahError> {
        if !entity.schema().is_composite() {
            return Ok(());
        }
        if depth >= MAX_DEPTH {
            return Err(PariahError::Schema(format!(
                "component tree below {} exceeds {MAX_DEPTH} levels",
                entity.kind()
            )));
        }

        let start = entity.components.len();
        self.component_mapper(entity.kind())?
            .load_components(self, entity, None)?;
        for component in entity.components[start..].iter_mut() {
            self.hydrate_at(component, depth + 1)?;
        }
        Ok(())
    }

    fn resolve(&self, kind: EntityKind) -> Result<(MapperClass, MapperOptions), PariahError> {
        let model = self.mapping.model(kind.name()).ok_or_else(|| {
            PariahError::Configuration(format!("no model configuration for {kind}"))
        })?;
        let class: MapperClass = model.mapper.parse()?;

        let mut merged: ConfigMap = self
            .mapping
            .mapper_defaults(class.name())
            .cloned()
            .unwrap_or_default();
        merged.extend(model.config.clone());

        Ok((class, MapperOptions::from_config(kind, &merged)?))
    }

    fn construct(&self, kind: EntityKind) -> Result<Arc<dyn Mapper>, PariahError> {
        let (class, options) = self.resolve(kind)?;
        let mapper = TableMapper::new(kind, class, options, self.store.clone())?;
        self.constructed.fetch_add(1, Ordering::SeqCst);
        tracing::info!(%kind, %class, table = %mapper.table(), "Constructed mapper");
        Ok(Arc::new(mapper))
    }
}
