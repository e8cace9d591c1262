//! CIDR parsing, canonical-form and containment checks

use super::field::{ErrorList, FieldError, FieldPath};
use ipnet::IpNet;

/// Parse `cidr`, reporting a parse failure against `path`.
pub fn parse_cidr(path: &FieldPath, cidr: &str) -> Result<IpNet, FieldError> {
    cidr.parse::<IpNet>()
        .map_err(|e| FieldError::invalid(path, cidr, format!("invalid CIDR address: {}", e)))
}

/// Reject CIDRs with host bits set or in a non-canonical spelling.
pub fn validate_cidr_is_canonical(path: &FieldPath, cidr: &str) -> ErrorList {
    let mut errs = ErrorList::new();
    match cidr.parse::<IpNet>() {
        Ok(net) if net.trunc().to_string() == cidr => {}
        _ => errs.push(FieldError::invalid(path, cidr, "must be valid canonical CIDR")),
    }
    errs
}

/// Require `subnet` to lie within `superset`.
pub fn validate_subset(path: &FieldPath, subnet: &str, superset: &str) -> ErrorList {
    let mut errs = ErrorList::new();
    let (Ok(sub), Ok(sup)) = (subnet.parse::<IpNet>(), superset.parse::<IpNet>()) else {
        return errs;
    };
    if !sup.contains(&sub.trunc()) {
        errs.push(FieldError::invalid(
            path,
            subnet,
            format!("must be a subset of {:?}", superset),
        ));
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> FieldPath {
        FieldPath::new("networks").child("workers")
    }

    #[test]
    fn test_canonical() {
        assert!(validate_cidr_is_canonical(&path(), "10.250.0.0/16").is_empty());
        assert!(validate_cidr_is_canonical(&path(), "2001:db8::/32").is_empty());
        assert_eq!(validate_cidr_is_canonical(&path(), "10.250.3.8/24").len(), 1);
        assert_eq!(validate_cidr_is_canonical(&path(), "2001:0db8::/32").len(), 1);
    }

    #[test]
    fn test_parse_error_names_field() {
        let err = parse_cidr(&path(), "10.250.0.0/33").unwrap_err();
        assert_eq!(err.field, "networks.workers");
    }

    #[test]
    fn test_subset() {
        assert!(validate_subset(&path(), "10.250.0.0/19", "10.250.0.0/16").is_empty());
        assert!(validate_subset(&path(), "10.250.0.0/16", "10.250.0.0/16").is_empty());

        let errs = validate_subset(&path(), "1.1.1.1/32", "10.250.0.0/16");
        let err = errs.iter().next().unwrap();
        assert_eq!(err.field, "networks.workers");
        assert_eq!(err.detail, r#"must be a subset of "10.250.0.0/16""#);
    }

    #[test]
    fn test_mixed_families_are_not_subsets() {
        assert_eq!(validate_subset(&path(), "2001:db8::/64", "10.0.0.0/8").len(), 1);
    }
}
