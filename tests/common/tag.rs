use async_trait::async_trait;
use rest_resource::{Action, MergeIntoActiveModel, Resource, Rule, Rules};
use sea_orm::{ActiveValue::Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Deserialize)]
pub struct TagCreate {
    pub name: String,
}

impl From<TagCreate> for ActiveModel {
    fn from(input: TagCreate) -> Self {
        ActiveModel {
            name: Set(input.name),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for TagUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name);
        }
        Ok(existing)
    }
}

/// Hard-deleting resource with an integer key and default hooks
pub struct TagResource;

#[async_trait]
impl Resource for TagResource {
    type Entity = Entity;
    type Model = Model;
    type Column = Column;
    type ActiveModel = ActiveModel;
    type CreateModel = TagCreate;
    type UpdateModel = TagUpdate;

    const ID_COLUMN: Column = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "tag";
    const RESOURCE_NAME_PLURAL: &'static str = "tags";

    fn rules(&self, _action: Action) -> Rules {
        Rules::new().field("name", [Rule::Required, Rule::String, Rule::Max(32.0)])
    }
}
