//! Parsing for the `Accessible` derive.
//!
//! Extracts the struct's named fields and their `#[accessor(...)]`
//! attributes into an `AccessibleDef` used for code generation.

use syn::{Attribute, Data, DeriveInput, Error, Fields, Generics, Ident, Lit, Result, Type};

/// Parsed struct with `#[derive(Accessible)]`.
#[derive(Debug)]
pub struct AccessibleDef {
    pub name: Ident,
    pub generics: Generics,
    /// Accessors in field order, skipped fields excluded.
    pub fields: Vec<AccessorField>,
}

/// One generated accessor.
#[derive(Debug)]
pub struct AccessorField {
    pub ident: Ident,
    pub ty: Type,
    /// Property name the accessor answers to.
    pub property: String,
    pub read_only: bool,
}

#[derive(Debug, Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    read_only: bool,
}

/// Parse a derive input into an `AccessibleDef`.
pub fn parse_accessible(input: &DeriveInput) -> Result<AccessibleDef> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "Accessible can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &input.ident,
            "Accessible requires a struct with named fields",
        ));
    };

    let mut fields: Vec<AccessorField> = Vec::new();
    for field in &named.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let property = match attrs.rename {
            Some(name) => name,
            None => to_camel_case(&ident.to_string()),
        };
        if !is_property_name(&property) {
            return Err(Error::new_spanned(
                &ident,
                format!("'{}' is not a valid property name", property),
            ));
        }
        if fields.iter().any(|f| f.property == property) {
            return Err(Error::new_spanned(
                &ident,
                format!("duplicate accessor property '{}'", property),
            ));
        }
        fields.push(AccessorField {
            ident,
            ty: field.ty.clone(),
            property,
            read_only: attrs.read_only,
        });
    }

    Ok(AccessibleDef {
        name: input.ident.clone(),
        generics: input.generics.clone(),
        fields,
    })
}

fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("accessor") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("skip") {
                result.skip = true;
            } else if path.is_ident("read_only") {
                result.read_only = true;
            } else if path.is_ident("rename") {
                let value: Lit = meta.value()?.parse()?;
                if let Lit::Str(lit_str) = value {
                    if result.rename.is_some() {
                        return Err(Error::new_spanned(
                            &meta.path,
                            "duplicate accessor attribute: rename",
                        ));
                    }
                    result.rename = Some(lit_str.value());
                } else {
                    return Err(Error::new_spanned(
                        value,
                        "expected string literal for rename",
                    ));
                }
            } else {
                return Err(meta.error("unknown accessor attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// `secret_name` -> `secretName`.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.trim_start_matches("r#").chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// Mirrors the runtime naming rule: a leading lowercase letter, then
// letters, digits or underscores.
fn is_property_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_camel_case("secret_name"), "secretName");
        assert_eq!(to_camel_case("team_id_2"), "teamId2");
        assert_eq!(to_camel_case("_private"), "private");
        assert_eq!(to_camel_case("r#type"), "type");
    }

    #[test]
    fn test_parse_fields_and_attrs() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                id: i64,
                #[accessor(rename = "alias")]
                secret_name: String,
                #[accessor(read_only)]
                created_at: i64,
                #[accessor(skip)]
                cache: Vec<u8>,
            }
        };
        let def = parse_accessible(&input).unwrap();
        assert_eq!(def.name, "Hero");
        let props: Vec<_> = def.fields.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(props, ["id", "alias", "createdAt"]);
        assert!(def.fields[2].read_only);
        assert!(!def.fields[0].read_only);
    }

    #[test]
    fn test_rejects_non_structs() {
        let input: DeriveInput = parse_quote! {
            enum Side { Light, Dark }
        };
        assert!(parse_accessible(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Pair(i64, i64);
        };
        assert!(parse_accessible(&input).is_err());
    }

    #[test]
    fn test_rejects_bad_attrs() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[accessor(rename = "Name")]
                name: String,
            }
        };
        assert!(parse_accessible(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[accessor(column = "x")]
                name: String,
            }
        };
        assert!(parse_accessible(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Hero {
                name: String,
                #[accessor(rename = "name")]
                alias: String,
            }
        };
        let err = parse_accessible(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate accessor property"));
    }
}
