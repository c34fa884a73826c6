use super::context::EntitiesContext;
use super::entity::Entity;
use super::error::ContextError;
use super::staging::Staged;
use std::marker::PhantomData;

/// Data access for one entity type, agnostic of which type it is.
pub trait Repository<T: Entity> {
    fn get_all(&mut self) -> Result<Vec<T>, ContextError>;

    fn get_entity(&mut self, key: i32) -> Result<Option<T>, ContextError>;

    fn insert_on_commit(&mut self, entity: T::New) -> Staged<T>;

    fn update_on_commit(&mut self, entity: T);

    fn delete_on_commit(&mut self, entity: &T);

    fn commit_changes(&mut self) -> Result<usize, ContextError>;
}

/// [`Repository`] over an owned [`EntitiesContext`].
#[derive(Debug)]
pub struct EntityRepository<T: Entity> {
    context: EntitiesContext,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityRepository<T> {
    pub fn new(context: EntitiesContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> &EntitiesContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EntitiesContext {
        &mut self.context
    }

    pub fn into_context(self) -> EntitiesContext {
        self.context
    }
}

impl<T: Entity> Repository<T> for EntityRepository<T> {
    fn get_all(&mut self) -> Result<Vec<T>, ContextError> {
        self.context.set::<T>().all()
    }

    fn get_entity(&mut self, key: i32) -> Result<Option<T>, ContextError> {
        self.context.set::<T>().find(key)
    }

    fn insert_on_commit(&mut self, entity: T::New) -> Staged<T> {
        self.context.set::<T>().add(entity)
    }

    fn update_on_commit(&mut self, entity: T) {
        self.context.set::<T>().update(entity)
    }

    fn delete_on_commit(&mut self, entity: &T) {
        self.context.delete_on_commit(entity)
    }

    fn commit_changes(&mut self) -> Result<usize, ContextError> {
        self.context.save_changes()
    }
}
