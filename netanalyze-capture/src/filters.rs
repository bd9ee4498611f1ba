//! Filter tokens to BPF expression
//!
//! Users describe traffic with `kind:value` tokens (`proto:tcp`, `port:443`,
//! `src:10.0.0.1`, ...). Values of the same kind are alternatives and are
//! OR-ed; different kinds must all hold and are AND-ed, always in the order
//! protocol, port, ip, src, dst.

use netanalyze_core::{Error, Result};

/// Kind of a filter token, in expression order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterKind {
    /// `proto:<name>` / `protocol:<name>`
    Protocol,
    /// `port:<n>`
    Port,
    /// `ip:<ip|ip6>`
    IpVersion,
    /// `src:<ip>`
    Source,
    /// `dst:<ip>` / `dest:<ip>`
    Destination,
}

/// A parsed filter token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterToken {
    pub kind: FilterKind,
    pub value: String,
}

impl FilterToken {
    /// Parse one `kind:value` token
    pub fn parse(token: &str) -> Result<Self> {
        let (kind, value) = token
            .split_once(':')
            .ok_or_else(|| Error::InvalidFilter(token.to_string()))?;

        let kind = match kind.trim() {
            "proto" | "protocol" => FilterKind::Protocol,
            "port" => FilterKind::Port,
            "ip" => FilterKind::IpVersion,
            "src" => FilterKind::Source,
            "dst" | "dest" => FilterKind::Destination,
            _ => return Err(Error::InvalidFilter(token.to_string())),
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidFilter(token.to_string()));
        }
        if kind == FilterKind::Port && value.parse::<u16>().is_err() {
            return Err(Error::InvalidFilter(token.to_string()));
        }

        Ok(FilterToken {
            kind,
            value: value.to_string(),
        })
    }

    /// BPF primitive for this token
    pub fn to_bpf(&self) -> String {
        match self.kind {
            FilterKind::Protocol if self.value.eq_ignore_ascii_case("dns") => port_filter(53),
            FilterKind::Protocol | FilterKind::IpVersion => self.value.clone(),
            FilterKind::Port => format!("port {}", self.value),
            FilterKind::Source => src_ip_filter(&self.value),
            FilterKind::Destination => dst_ip_filter(&self.value),
        }
    }
}

/// Filter for specific source IP
pub fn src_ip_filter(ip: &str) -> String {
    format!("src host {}", ip)
}

/// Filter for specific destination IP
pub fn dst_ip_filter(ip: &str) -> String {
    format!("dst host {}", ip)
}

/// Filter for a port in either direction
pub fn port_filter(port: u16) -> String {
    format!("port {}", port)
}

/// Combine alternatives with OR, parenthesised when there is more than one
pub fn any_of(filters: &[String]) -> String {
    match filters {
        [] => String::new(),
        [single] => single.clone(),
        many => format!("({})", many.join(" or ")),
    }
}

/// Parse tokens and build the BPF expression; empty input gives ""
pub fn build_expression<S: AsRef<str>>(tokens: &[S]) -> Result<String> {
    let mut parsed = tokens
        .iter()
        .map(|token| FilterToken::parse(token.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    // stable: alternatives keep their command-line order
    parsed.sort_by_key(|token| token.kind);

    let mut groups: Vec<(FilterKind, Vec<String>)> = Vec::new();
    for token in &parsed {
        let bpf = token.to_bpf();
        if let Some((kind, parts)) = groups.last_mut() {
            if *kind == token.kind {
                parts.push(bpf);
                continue;
            }
        }
        groups.push((token.kind, vec![bpf]));
    }

    Ok(groups
        .iter()
        .map(|(_, parts)| any_of(parts))
        .collect::<Vec<_>>()
        .join(" and "))
}
