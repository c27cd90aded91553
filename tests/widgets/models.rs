use std::sync::Arc;

use datarepo::{Data, DataModel, ValueKind};
use uuid::Uuid;

pub fn widget_model() -> Arc<DataModel> {
    let mut builder = DataModel::builder("shop.Widget", "widgets");
    builder.add_key_field("Id", ValueKind::Guid);
    builder.add_field("Name", ValueKind::ShortString);
    builder.add_nullable_field("Price", ValueKind::Double);
    builder.add_field("Drawing", ValueKind::Stream);
    builder.add_field("Gearing", ValueKind::Json);
    builder.build()
}

pub fn widget(model: &Arc<DataModel>, id: Uuid, name: &str) -> Data {
    let mut data = Data::new(model);
    data.set("Id", id);
    data.set("Name", name);
    data
}
