use mgc_core::resource::{Attributes, Value};
use mgc_sdk::network::{PublicIp, Rule, SecurityGroup, Subnet, Vpc};

use crate::tfutil::{attributes, opt_time_to_rfc3339};

pub fn flatten_vpc(vpc: &Vpc) -> Attributes {
    attributes([
        ("id", vpc.id.clone().into()),
        ("name", vpc.name.clone().into()),
        ("description", vpc.description.clone().into()),
        ("status", vpc.status.clone().into()),
        ("is_default", vpc.is_default.into()),
        ("tenant_id", vpc.tenant_id.clone().into()),
        ("router_id", vpc.router_id.clone().into()),
        ("external_network", vpc.external_network.clone().into()),
        ("subnets", vpc.subnets.clone().into()),
        ("security_groups", vpc.security_groups.clone().into()),
        ("created_at", opt_time_to_rfc3339(vpc.created_at.as_ref()).into()),
        ("updated_at", opt_time_to_rfc3339(vpc.updated.as_ref()).into()),
    ])
}

pub fn flatten_subnet(subnet: &Subnet) -> Attributes {
    attributes([
        ("id", subnet.id.clone().into()),
        ("name", subnet.name.clone().into()),
        ("description", subnet.description.clone().into()),
        ("vpc_id", subnet.vpc_id.clone().into()),
        ("cidr_block", subnet.cidr_block.clone().into()),
        ("ip_version", subnet.ip_version.clone().into()),
        ("gateway_ip", subnet.gateway_ip.clone().into()),
        ("dns_nameservers", subnet.dns_nameservers.clone().into()),
        ("subnetpool_id", subnet.subnetpool_id.clone().into()),
        ("availability_zone", subnet.zone.clone().into()),
        (
            "created_at",
            opt_time_to_rfc3339(subnet.created_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_rule(rule: &Rule) -> Attributes {
    attributes([
        ("id", rule.id.clone().into()),
        ("security_group_id", rule.security_group_id.clone().into()),
        ("direction", rule.direction.clone().into()),
        ("ethertype", rule.ethertype.clone().into()),
        ("protocol", rule.protocol.clone().into()),
        ("port_range_min", rule.port_range_min.into()),
        ("port_range_max", rule.port_range_max.into()),
        ("remote_ip_prefix", rule.remote_ip_prefix.clone().into()),
        ("remote_group_id", rule.remote_group_id.clone().into()),
        ("description", rule.description.clone().into()),
        ("status", rule.status.clone().into()),
        ("created_at", opt_time_to_rfc3339(rule.created_at.as_ref()).into()),
    ])
}

pub fn flatten_security_group(group: &SecurityGroup) -> Attributes {
    attributes([
        ("id", group.id.clone().into()),
        ("name", group.name.clone().into()),
        ("description", group.description.clone().into()),
        ("vpc_id", group.vpc_id.clone().into()),
        ("status", group.status.clone().into()),
        ("error", group.error.clone().into()),
        ("is_default", group.is_default.into()),
        (
            "rules",
            Value::List(group.rules.iter().map(|r| Value::Map(flatten_rule(r))).collect()),
        ),
        ("created_at", opt_time_to_rfc3339(group.created_at.as_ref()).into()),
        ("updated_at", opt_time_to_rfc3339(group.updated.as_ref()).into()),
    ])
}

pub fn flatten_public_ip(ip: &PublicIp) -> Attributes {
    attributes([
        ("id", ip.id.clone().into()),
        ("vpc_id", ip.vpc_id.clone().into()),
        ("public_ip", ip.public_ip.clone().into()),
        ("description", ip.description.clone().into()),
        ("port_id", ip.port_id.clone().into()),
        ("status", ip.status.clone().into()),
        ("error", ip.error.clone().into()),
        ("created_at", opt_time_to_rfc3339(ip.created_at.as_ref()).into()),
        ("updated_at", opt_time_to_rfc3339(ip.updated.as_ref()).into()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn security_group_nests_rules() {
        let group: SecurityGroup = serde_json::from_value(json!({
            "id": "sg-1",
            "name": "web",
            "status": "created",
            "rules": [{
                "id": "r-1",
                "direction": "ingress",
                "ethertype": "IPv4",
                "protocol": "tcp",
                "port_range_min": 443,
                "port_range_max": 443,
                "remote_ip_prefix": "0.0.0.0/0"
            }]
        }))
        .unwrap();

        let attrs = flatten_security_group(&group);
        let Value::List(rules) = &attrs["rules"] else {
            panic!("expected list");
        };
        let rule = rules[0].as_map().unwrap();
        assert_eq!(rule["port_range_min"], Value::from(443i64));
        assert_eq!(rule["remote_group_id"], Value::Null);
        assert_eq!(attrs["created_at"], Value::Null);
    }

    #[test]
    fn subnet_zone_is_availability_zone() {
        let subnet: Subnet = serde_json::from_value(json!({
            "id": "sn-1",
            "vpc_id": "vpc-1",
            "cidr_block": "10.0.0.0/24",
            "ip_version": "IPv4",
            "zone": "br-se1-a"
        }))
        .unwrap();
        let attrs = flatten_subnet(&subnet);
        assert_eq!(attrs["availability_zone"], Value::from("br-se1-a"));
        assert_eq!(attrs["dns_nameservers"], Value::List(vec![]));
    }
}
