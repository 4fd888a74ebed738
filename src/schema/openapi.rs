//! OpenAPI 3 document for the synthesized routes, built with utoipa's builders.

use crate::config::{FieldType, Method, ModelCatalog, ResolvedModel, ID_FIELD};
use crate::routes::{RouteEntry, RouteIntent, RouteTable};
use std::collections::BTreeMap;
use utoipa::openapi::path::{OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{Array, SchemaType, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, ObjectBuilder, OpenApi, OpenApiBuilder, PathItem, PathsBuilder,
    Ref, RefOr, Required, ResponseBuilder, Schema,
};

fn primitive(t: Type) -> RefOr<Schema> {
    Schema::Object(ObjectBuilder::new().schema_type(SchemaType::Type(t)).build()).into()
}

fn model_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

/// Field type as an OpenAPI schema; model references point into `components/schemas`.
pub fn field_schema(catalog: &ModelCatalog, ty: &FieldType) -> RefOr<Schema> {
    match ty {
        FieldType::String | FieldType::Opaque(_) => primitive(Type::String),
        FieldType::Integer => primitive(Type::Integer),
        FieldType::Float => primitive(Type::Number),
        FieldType::Boolean => primitive(Type::Boolean),
        FieldType::Object => primitive(Type::Object),
        FieldType::List(inner) => Schema::Array(Array::new(field_schema(catalog, inner))).into(),
        FieldType::Model(name) if catalog.model(name).is_some() => model_ref(name),
        FieldType::Model(_) => primitive(Type::String),
    }
}

/// Component schema for a model instance. Storable instances carry the integer id.
pub fn model_schema(catalog: &ModelCatalog, model: &ResolvedModel) -> RefOr<Schema> {
    let mut object = ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .title(Some(model.name.clone()));
    if model.storable {
        object = object.property(ID_FIELD, primitive(Type::Integer));
    }
    for f in &model.fields {
        object = object.property(f.name.clone(), field_schema(catalog, &f.ty));
        if f.is_required() {
            object = object.required(f.name.clone());
        }
    }
    Schema::Object(object.build()).into()
}

fn response_schema(catalog: &ModelCatalog, route: &RouteEntry) -> Option<RefOr<Schema>> {
    let model = catalog.model(&route.model)?;
    match &route.intent {
        RouteIntent::Create | RouteIntent::Read | RouteIntent::Update => Some(model_ref(&model.name)),
        RouteIntent::List => Some(Schema::Array(Array::new(model_ref(&model.name))).into()),
        RouteIntent::Schema | RouteIntent::Delete => Some(primitive(Type::Object)),
        RouteIntent::Action { name } => {
            let action = model.action(name)?;
            action.returns.as_ref().map(|t| field_schema(catalog, t))
        }
    }
}

fn body_schema(catalog: &ModelCatalog, route: &RouteEntry) -> Option<RefOr<Schema>> {
    if !route.takes_body() {
        return None;
    }
    let model = catalog.model(&route.model)?;
    match &route.intent {
        RouteIntent::Create | RouteIntent::Update => Some(model_ref(&model.name)),
        RouteIntent::Action { name } => {
            let action = model.action(name)?;
            let mut object = ObjectBuilder::new().schema_type(SchemaType::Type(Type::Object));
            for p in &action.params {
                object = object.property(p.name.clone(), field_schema(catalog, &p.ty));
                if p.is_required() {
                    object = object.required(p.name.clone());
                }
            }
            Some(Schema::Object(object.build()).into())
        }
        _ => None,
    }
}

fn operation(catalog: &ModelCatalog, route: &RouteEntry) -> utoipa::openapi::path::Operation {
    let mut op = OperationBuilder::new()
        .operation_id(Some(format!("{}_{}_{}", route.table, route.intent.label(), route.method.as_str().to_lowercase())))
        .tag(route.table.clone());
    if route.has_id() {
        op = op.parameter(
            ParameterBuilder::new()
                .name(ID_FIELD)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(primitive(Type::Integer)))
                .build(),
        );
    }
    if let Some(schema) = body_schema(catalog, route) {
        op = op.request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", ContentBuilder::new().schema(Some(schema)).build())
                .required(Some(Required::True))
                .build(),
        ));
    }
    let mut response = ResponseBuilder::new().description(route.intent.label());
    if let Some(schema) = response_schema(catalog, route) {
        response = response.content("application/json", ContentBuilder::new().schema(Some(schema)).build());
    }
    op = op.response(route.success_status.to_string(), response.build());
    if route.has_id() {
        op = op.response("404", ResponseBuilder::new().description("not found").build());
    }
    if route.takes_body() {
        op = op.response("400", ResponseBuilder::new().description("invalid input").build());
    }
    op.build()
}

/// OpenAPI paths use `{id}` already, so route templates carry over unchanged.
pub fn openapi(catalog: &ModelCatalog, table: &RouteTable, version: &str) -> OpenApi {
    let mut items: BTreeMap<&str, PathItem> = BTreeMap::new();
    for route in table.iter() {
        let item = items.entry(route.path.as_str()).or_default();
        let op = Some(operation(catalog, route));
        match route.method {
            Method::Get => item.get = op,
            Method::Post => item.post = op,
            Method::Put => item.put = op,
            Method::Delete => item.delete = op,
        }
    }
    let mut paths = PathsBuilder::new();
    for (path, item) in items {
        paths = paths.path(path, item);
    }

    let mut components = ComponentsBuilder::new();
    for model in &catalog.models {
        components = components.schema(model.name.clone(), model_schema(catalog, model));
    }

    OpenApiBuilder::new()
        .info(InfoBuilder::new().title("blueprint-sdk").version(version).build())
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}
