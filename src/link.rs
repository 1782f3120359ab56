//! Link-layer machinery: Ethernet value types, the ARP wire codec,
//! and the network interface that ties them to the IP layer.

pub mod arp;
pub mod ethernet;
pub mod interface;
