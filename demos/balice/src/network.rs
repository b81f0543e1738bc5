//! Embedded Kraków-Balice-style layout, shared by `balice` and
//! `export_layout`.
//!
//! ```text
//!      S1  S2  S3      S4  S5  S6      S7  S8        stands
//!       \  |  /         \  |  /         \  /
//!         A1 ----------- A2 ----------- A3           apron
//!          |              |              |
//!   B1 -- B2 ---- B3 --- B4 ----- B5 -- B6           parallel taxiway
//!   |                              |     |
//!  RWY07 == R2 ==== R3 ==== R4 === R5 == RWY25       runway 07/25
//! ```
//!
//! B1 is the holding point for RWY07; B5 and B6 are the runway exits.

use std::io::Cursor;

use gm_topology::{AirportGraph, TopologyResult, load_readers};

pub const NODES_CSV: &str = "\
id,type,name,x,y,notes
1,runway_thr,RWY07,3,5,active threshold
2,connector,R2,8,5,
3,connector,R3,13,5,
4,connector,R4,18,5,
5,connector,R5,22,5,
6,runway_thr,RWY25,26,5,
11,taxiway,B1,3,4,holding point RWY07
12,taxiway,B2,7,4,
13,taxiway,B3,12,4,
14,taxiway,B4,16,4,
15,taxiway,B5,22,4,rapid exit
16,taxiway,B6,25,4,end exit
21,apron,A1,7,3,
22,apron,A2,16,3,
23,apron,A3,25,3,
31,stand,S1,5,2,
32,stand,S2,7,2,
33,stand,S3,9,2,
34,stand,S4,14,2,
35,stand,S5,16,2,
36,stand,S6,18,2,
37,stand,S7,24,2,
38,stand,S8,26,2,
";

pub const EDGES_CSV: &str = "\
from,to,type,length,bidirectional
1,2,runway,,true
2,3,runway,,true
3,4,runway,,true
4,5,runway,,true
5,6,runway,,true
11,1,runway_entry,,true
5,15,runway_exit,,false
6,16,runway_exit,,false
11,12,taxiway,,true
12,13,taxiway,,true
13,14,taxiway,,true
14,15,taxiway,,true
15,16,taxiway,,true
12,21,apron_link,,true
14,22,apron_link,,true
16,23,apron_link,,true
21,22,taxiway,,true
22,23,taxiway,,true
21,31,stand_link,,true
21,32,stand_link,,true
21,33,stand_link,,true
22,34,stand_link,,true
22,35,stand_link,,true
22,36,stand_link,,true
23,37,stand_link,,true
23,38,stand_link,,true
";

pub fn build_layout() -> TopologyResult<AirportGraph> {
    load_readers(Cursor::new(NODES_CSV), Cursor::new(EDGES_CSV))
}
