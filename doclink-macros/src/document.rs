use convert_case::{Case, Casing};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    DataStruct, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr, PathArguments, Result,
    Type, ext::IdentExt, spanned::Spanned,
};

const CREATION_INDEX: &str = "by_creation_time";
const CREATION_TIME_FIELD: &str = "_creation_time";
const SYSTEM_PREFIX: &str = "_";

struct IndexAttr {
    name: String,
    fields: Vec<String>,
    span: Span,
}

#[derive(Default)]
struct ContainerAttrs {
    collection: Option<LitStr>,
    module: Option<LitStr>,
    system: bool,
    indexes: Vec<IndexAttr>,
}

struct FieldInfo<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    marker: Ident,
}

pub(crate) fn generate_document_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let vis = &ast.vis;

    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&ast.generics, "Document cannot be derived for generic structs"));
    }

    let named = match &data.fields {
        Fields::Named(named) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Document can only be derived for structs with named fields",
            ));
        }
    };

    let attrs = parse_container_attrs(ast)?;

    let collection = attrs
        .collection
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(name, "missing #[document(collection = \"...\")]"))?;
    let collection_name = collection.value();

    let module = match &attrs.module {
        Some(module) => parse_ident(&module.value(), module.span())?,
        None => parse_ident(&collection_name, collection.span()).map_err(|_| {
            syn::Error::new_spanned(
                collection,
                "collection name is not a valid module name; set #[document(module = \"...\")]",
            )
        })?,
    };

    let id_field = find_id_field(named.iter(), name)?;
    let id_ident = id_field.ident.as_ref().ok_or_else(|| syn::Error::new_spanned(id_field, "expected a named field"))?;

    // The primary identifier gets no marker, so it never serves as a lookup or join field.
    let mut fields = Vec::new();
    for field in named.iter().filter(|field| field.ident.as_ref() != Some(id_ident)) {
        let Some(ident) = field.ident.as_ref() else { continue };
        let field_name = ident.unraw().to_string();
        let marker = format_ident!("{}", field_name.to_case(Case::Pascal), span = ident.span());

        if let Some(other) = fields.iter().find(|other: &&FieldInfo| other.marker == marker) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("fields {} and {} map to the same marker {}", other.name, field_name, marker),
            ));
        }

        fields.push(FieldInfo { ident, name: field_name, ty: &field.ty, marker });
    }

    validate_indexes(&attrs.indexes, &fields)?;

    let kind = if attrs.system || collection_name.starts_with(SYSTEM_PREFIX) {
        quote!(::doclink::document::System)
    } else {
        quote!(::doclink::document::Ordinary)
    };

    let index_defs = attrs.indexes.iter().map(|index| {
        let index_name = &index.name;
        let index_fields = &index.fields;
        quote! {
            .with_index(::doclink::schema::IndexDef::new(#index_name, [#(#index_fields),*]))
        }
    });

    let reference_defs = fields.iter().filter(|field| is_reference(field.ty)).map(|field| {
        let field_name = &field.name;
        let ty = field.ty;
        quote! {
            .with_reference(::doclink::schema::ReferenceDef::of::<#ty>(#field_name))
        }
    });

    // Markers are declared inside the module, but their impls stay at the struct's scope so
    // field types resolve where they were written, even when a marker shares their name.
    let field_markers = fields.iter().map(|field| {
        let marker = &field.marker;
        quote! {
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct #marker;
        }
    });

    let field_impls = fields.iter().map(|field| {
        let FieldInfo { ident, name: field_name, ty, marker } = field;
        quote! {
            impl ::doclink::schema::Field for #module::#marker {
                type Collection = #name;
                type Value = #ty;
                const NAME: &'static str = #field_name;

                fn get(document: &#name) -> &#ty {
                    &document.#ident
                }
            }
        }
    });

    let mut distinct_impls = Vec::new();
    for field in &fields {
        for other in fields.iter().filter(|other| other.marker != field.marker) {
            let (marker, other) = (&field.marker, &other.marker);
            distinct_impls.push(quote! {
                impl ::doclink::schema::DistinctField<#module::#other> for #module::#marker {}
            });
        }
    }

    let mut index_markers = Vec::new();
    let mut index_impls = Vec::new();

    for index in &attrs.indexes {
        let index_name = &index.name;
        let index_fields = &index.fields;
        let covered = index_fields
            .iter()
            .filter_map(|field| fields.iter().find(|info| info.name == *field))
            .map(|info| &info.marker)
            .collect::<Vec<_>>();

        let index_impl = |marker: &Ident| quote! {
            impl ::doclink::schema::Index for #module::#marker {
                type Collection = #name;
                const NAME: &'static str = #index_name;
                const FIELDS: &'static [&'static str] = &[#(#index_fields),*];
            }

            #(impl ::doclink::schema::IndexCovers<#module::#covered> for #module::#marker {})*
        };

        match field_named_marker(index, &fields) {
            Some(marker) => {
                let index_impl = index_impl(marker);
                index_impls.push(quote! {
                    #index_impl

                    impl ::doclink::schema::FieldNamedIndex for #module::#marker {
                        type Field = Self;
                    }
                });
            }
            None => {
                // Validated above.
                let marker = format_ident!("{}", index.name.to_case(Case::Pascal), span = index.span);
                index_impls.push(index_impl(&marker));
                index_markers.push(quote! {
                    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
                    pub struct #marker;
                });
            }
        }
    }

    let module_doc = format!("Field and index markers of the `{}` collection.", collection_name);

    Ok(quote! {
        impl ::doclink::document::Document for #name {
            type Kind = #kind;

            fn id(&self) -> &::doclink::document::Id<Self> {
                &self.#id_ident
            }

            fn collection_name() -> &'static str {
                #collection_name
            }

            fn schema() -> ::doclink::schema::CollectionSchema {
                ::doclink::schema::CollectionSchema::new(#collection_name)
                    #(#index_defs)*
                    #(#reference_defs)*
            }
        }

        #[doc = #module_doc]
        #[allow(dead_code)]
        #vis mod #module {
            #(#field_markers)*

            #(#index_markers)*
        }

        #(#field_impls)*

        #(#distinct_impls)*

        #(#index_impls)*
    })
}

fn parse_container_attrs(ast: &DeriveInput) -> Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs::default();

    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                attrs.collection = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("module") {
                attrs.module = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("system") {
                attrs.system = true;
                Ok(())
            } else if meta.path.is_ident("index") {
                let span = meta.path.span();
                let mut index_name: Option<String> = None;
                let mut index_fields: Option<Vec<String>> = None;

                meta.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        let s: LitStr = meta.value()?.parse()?;
                        index_name = Some(s.value());
                        Ok(())
                    } else if meta.path.is_ident("fields") {
                        let s: LitStr = meta.value()?.parse()?;
                        index_fields = Some(
                            s.value()
                                .split(',')
                                .map(str::trim)
                                .filter(|field| !field.is_empty())
                                .map(str::to_string)
                                .collect(),
                        );
                        Ok(())
                    } else {
                        Err(meta.error("unknown index attribute, expected `name` or `fields`"))
                    }
                })?;

                match (index_name, index_fields) {
                    (Some(name), Some(fields)) => {
                        attrs.indexes.push(IndexAttr { name, fields, span });
                        Ok(())
                    }
                    _ => Err(meta.error("index requires both `name` and `fields`")),
                }
            } else {
                Err(meta.error("unknown document attribute"))
            }
        })?;
    }

    Ok(attrs)
}

fn find_id_field<'a>(mut fields: impl Iterator<Item = &'a Field> + Clone, name: &Ident) -> Result<&'a Field> {
    let mut marked = None;

    for field in fields.clone() {
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    if marked.is_some() {
                        return Err(meta.error("multiple id fields are not allowed"));
                    }
                    marked = Some(field);
                    Ok(())
                } else {
                    Err(meta.error("unknown document field attribute, expected `id`"))
                }
            })?;
        }
    }

    marked
        .or_else(|| fields.find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id")))
        .ok_or_else(|| {
            syn::Error::new_spanned(name, "no identifier field; name it `id` or mark it with #[document(id)]")
        })
}

fn validate_indexes(indexes: &[IndexAttr], fields: &[FieldInfo<'_>]) -> Result<()> {
    for (position, index) in indexes.iter().enumerate() {
        let error = |message: String| Err(syn::Error::new(index.span, message));

        if index.name == CREATION_INDEX {
            return error(format!("index name `{}` is reserved", CREATION_INDEX));
        }
        if index.fields.is_empty() {
            return error(format!("index `{}` declares no fields", index.name));
        }
        if index.fields.iter().any(|field| field == CREATION_TIME_FIELD) {
            return error(format!("index `{}` may not list `{}`", index.name, CREATION_TIME_FIELD));
        }
        if let Some(unknown) = index.fields.iter().find(|field| !fields.iter().any(|info| info.name == **field)) {
            return error(format!("index `{}` names unknown field `{}`", index.name, unknown));
        }
        if let Some(repeated) = index.fields.iter().enumerate().find_map(|(i, field)| {
            index.fields[..i].contains(field).then_some(field)
        }) {
            return error(format!("index `{}` lists `{}` twice", index.name, repeated));
        }
        if indexes[..position].iter().any(|other| other.name == index.name) {
            return error(format!("index `{}` is declared twice", index.name));
        }

        let named_after_field = fields.iter().any(|info| info.name == index.name);
        if named_after_field && field_named_marker(index, fields).is_none() {
            return error(format!(
                "index `{}` is named after a field, so it must index exactly that field",
                index.name
            ));
        }

        if !named_after_field {
            let marker = parse_ident(&index.name.to_case(Case::Pascal), index.span)?;

            if fields.iter().any(|info| info.marker == marker) {
                return error(format!("index `{}` maps to the marker of a field ({})", index.name, marker));
            }

            let clash = indexes[..position].iter().any(|other| {
                !fields.iter().any(|info| info.name == other.name)
                    && other.name.to_case(Case::Pascal) == marker.to_string()
            });
            if clash {
                return error(format!("index `{}` maps to the same marker as another index", index.name));
            }
        }
    }

    Ok(())
}

/// Returns the field marker doubling as the index marker when `index` indexes exactly the
/// field it is named after.
fn field_named_marker<'a>(index: &IndexAttr, fields: &'a [FieldInfo<'_>]) -> Option<&'a Ident> {
    match index.fields.as_slice() {
        [only] if *only == index.name => fields
            .iter()
            .find(|info| info.name == index.name)
            .map(|info| &info.marker),
        _ => None,
    }
}

fn parse_ident(value: &str, span: Span) -> Result<Ident> {
    syn::parse_str::<Ident>(value)
        .map(|ident| Ident::new(&ident.to_string(), span))
        .map_err(|_| syn::Error::new(span, format!("`{}` is not a valid identifier", value)))
}

/// `Id<T>` or `Option<Id<T>>`, matched on the last path segment.
fn is_reference(ty: &Type) -> bool {
    match single_type_argument(ty) {
        Some(("Id", _)) => true,
        Some(("Option", inner)) => matches!(single_type_argument(inner), Some(("Id", _))),
        _ => false,
    }
}

fn single_type_argument(ty: &Type) -> Option<(&'static str, &Type)> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;

    let wrapper = if segment.ident == "Id" {
        "Id"
    } else if segment.ident == "Option" {
        "Option"
    } else {
        return None;
    };

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else { return None };

    match arguments.args.iter().collect::<Vec<_>>().as_slice() {
        [GenericArgument::Type(inner)] => Some((wrapper, inner)),
        _ => None,
    }
}
