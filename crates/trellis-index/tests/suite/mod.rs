mod closure;
mod executable;
mod file_index;
mod fixture;
mod sync_flow;
mod target_tree;
